//! Library panel swap
//!
//! "Use instead of current panel" replaces the edited panel's model with a
//! library panel's model. The plugin type switches immediately; the model
//! itself is restored after a short delay so the new plugin can settle first.
//! Picking another library panel before the delay elapses supersedes the
//! pending restore, using the same sequence guard as option fetches.

use crate::events::PanelEvent;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;

/// Panel position on the dashboard grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Link from a panel to the library panel it was created from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryPanelRef {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub version: u64,
}

/// The panel being edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelModel {
    pub id: u32,
    #[serde(rename = "type")]
    pub panel_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub grid_pos: GridPos,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_panel: Option<LibraryPanelRef>,
    /// Unsaved edits since the last load or restore
    #[serde(skip)]
    pub has_changed: bool,
    /// Everything else (targets, options, field config, ...)
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl PanelModel {
    pub fn new(id: u32, panel_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            panel_type: panel_type.into(),
            title: title.into(),
            grid_pos: GridPos {
                x: 0,
                y: 0,
                w: 12,
                h: 8,
            },
            library_panel: None,
            has_changed: false,
            body: Map::new(),
        }
    }

    /// Replace this panel's model with `library`'s, keeping identity and layout
    ///
    /// The library model's `type` is ignored: the plugin has already been
    /// switched and the current `panel_type` is authoritative.
    pub fn restore_model(&mut self, library: &LibraryPanel) -> Result<(), serde_json::Error> {
        let Some(model) = library.model.as_object() else {
            return Err(serde::de::Error::custom(format!(
                "library panel {} model is not an object",
                library.uid
            )));
        };
        let mut model = model.clone();
        model.insert("id".to_string(), Value::from(self.id));
        model.insert("type".to_string(), Value::from(self.panel_type.clone()));
        model.insert("gridPos".to_string(), serde_json::to_value(self.grid_pos)?);
        model.insert(
            "libraryPanel".to_string(),
            serde_json::to_value(library.to_ref())?,
        );

        *self = serde_json::from_value(Value::Object(model))?;
        self.has_changed = false;
        Ok(())
    }
}

/// A reusable panel stored in the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryPanel {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub version: u64,
    /// Full panel model JSON, including its `type`
    pub model: Value,
}

impl LibraryPanel {
    pub fn panel_type(&self) -> Option<&str> {
        self.model.get("type").and_then(Value::as_str)
    }

    pub fn to_ref(&self) -> LibraryPanelRef {
        LibraryPanelRef {
            uid: self.uid.clone(),
            name: self.name.clone(),
            version: self.version,
        }
    }
}

/// What became of a pending restore
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    Restored { uid: String },
    /// A later pick replaced this one before it ran
    Superseded { uid: String },
    /// The library model could not be applied; the panel is unchanged
    Failed { uid: String, message: String },
}

struct PendingSwap {
    sequence: u64,
    library: LibraryPanel,
}

/// Owns the edited panel and its delayed library-panel restores
pub struct PanelSwapper {
    panel: PanelModel,
    delay: Duration,
    sequence: u64,
    pending: FuturesUnordered<BoxFuture<'static, PendingSwap>>,
    events: Option<mpsc::UnboundedSender<PanelEvent>>,
}

impl PanelSwapper {
    pub fn new(panel: PanelModel, delay: Duration) -> Self {
        Self {
            panel,
            delay,
            sequence: 0,
            pending: FuturesUnordered::new(),
            events: None,
        }
    }

    pub fn with_events(mut self, sender: mpsc::UnboundedSender<PanelEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn panel(&self) -> &PanelModel {
        &self.panel
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Start replacing the panel with `library`
    pub fn use_library_panel(&mut self, library: &LibraryPanel) {
        self.sequence += 1;

        if let Some(new_type) = library.panel_type() {
            if new_type != self.panel.panel_type {
                let from = std::mem::replace(&mut self.panel.panel_type, new_type.to_string());
                tracing::debug!(from = %from, to = %new_type, "Changing panel plugin");
                self.emit(PanelEvent::PluginChanged {
                    timestamp: Utc::now(),
                    from,
                    to: new_type.to_string(),
                });
            }
        }

        let delay = self.delay;
        let swap = PendingSwap {
            sequence: self.sequence,
            library: library.clone(),
        };
        self.pending.push(
            async move {
                tokio::time::sleep(delay).await;
                swap
            }
            .boxed(),
        );
    }

    /// Wait for the next pending restore and apply it if still current
    pub async fn next_swap(&mut self) -> Option<SwapOutcome> {
        let swap = self.pending.next().await?;
        let uid = swap.library.uid.clone();

        if swap.sequence != self.sequence {
            self.emit(PanelEvent::SwapSuperseded {
                timestamp: Utc::now(),
                library_uid: uid.clone(),
            });
            return Some(SwapOutcome::Superseded { uid });
        }

        if let Err(e) = self.panel.restore_model(&swap.library) {
            tracing::warn!(library_uid = %uid, "Failed to restore library panel: {}", e);
            return Some(SwapOutcome::Failed {
                uid,
                message: e.to_string(),
            });
        }

        tracing::info!(library_uid = %uid, panel_id = self.panel.id, "Restored library panel");
        let now = Utc::now();
        self.emit(PanelEvent::Restored {
            timestamp: now,
            library_uid: uid.clone(),
        });
        self.emit(PanelEvent::Refreshed { timestamp: now });
        self.emit(PanelEvent::QueriesChanged { timestamp: now });
        self.emit(PanelEvent::OptionsChanged { timestamp: now });
        Some(SwapOutcome::Restored { uid })
    }

    /// Apply every pending restore
    pub async fn settle(&mut self) -> Vec<SwapOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next_swap().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    fn emit(&self, event: PanelEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn library(uid: &str, panel_type: &str, title: &str) -> LibraryPanel {
        LibraryPanel {
            uid: uid.to_string(),
            name: format!("{} panel", uid),
            version: 3,
            model: json!({
                "id": 99,
                "type": panel_type,
                "title": title,
                "gridPos": {"x": 5, "y": 5, "w": 1, "h": 1},
                "targets": [{"refId": "A"}]
            }),
        }
    }

    fn edited_panel() -> PanelModel {
        let mut panel = PanelModel::new(7, "timeseries", "CPU");
        panel.grid_pos = GridPos {
            x: 12,
            y: 4,
            w: 12,
            h: 9,
        };
        panel.has_changed = true;
        panel
    }

    #[test]
    fn test_restore_keeps_identity_and_layout() {
        let mut panel = edited_panel();
        panel.restore_model(&library("lib-a", "timeseries", "Shared CPU")).unwrap();

        assert_eq!(panel.id, 7);
        assert_eq!(panel.grid_pos.x, 12);
        assert_eq!(panel.grid_pos.h, 9);
        assert_eq!(panel.title, "Shared CPU");
        assert_eq!(panel.library_panel.as_ref().map(|l| l.uid.as_str()), Some("lib-a"));
        assert!(panel.body.contains_key("targets"));
        assert!(!panel.has_changed);
    }

    #[tokio::test]
    async fn test_plugin_changes_immediately_model_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut swapper =
            PanelSwapper::new(edited_panel(), Duration::from_millis(10)).with_events(tx);

        swapper.use_library_panel(&library("lib-a", "stat", "Shared"));

        assert_eq!(swapper.panel().panel_type, "stat");
        assert_eq!(swapper.panel().title, "CPU", "model not restored yet");
        assert!(matches!(
            rx.try_recv(),
            Ok(PanelEvent::PluginChanged { ref from, .. }) if from == "timeseries"
        ));

        let outcome = swapper.next_swap().await;
        assert_eq!(
            outcome,
            Some(SwapOutcome::Restored {
                uid: "lib-a".to_string()
            })
        );
        assert_eq!(swapper.panel().panel_type, "stat");
        assert_eq!(swapper.panel().title, "Shared");

        let after: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(after
            .iter()
            .any(|e| matches!(e, PanelEvent::QueriesChanged { .. })));
        assert!(after
            .iter()
            .any(|e| matches!(e, PanelEvent::OptionsChanged { .. })));
    }

    #[tokio::test]
    async fn test_second_pick_supersedes_pending_restore() {
        let mut swapper = PanelSwapper::new(edited_panel(), Duration::from_millis(10));

        swapper.use_library_panel(&library("lib-a", "timeseries", "First"));
        swapper.use_library_panel(&library("lib-b", "gauge", "Second"));
        assert_eq!(swapper.pending(), 2);

        let outcomes = swapper.settle().await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&SwapOutcome::Superseded {
            uid: "lib-a".to_string()
        }));
        assert!(outcomes.contains(&SwapOutcome::Restored {
            uid: "lib-b".to_string()
        }));

        let panel = swapper.panel();
        assert_eq!(panel.title, "Second");
        assert_eq!(panel.panel_type, "gauge");
        assert_eq!(panel.library_panel.as_ref().unwrap().uid, "lib-b");
    }

    #[tokio::test]
    async fn test_invalid_library_model_leaves_panel_untouched() {
        let mut swapper = PanelSwapper::new(edited_panel(), Duration::ZERO);
        let broken = LibraryPanel {
            uid: "broken".to_string(),
            name: "Broken".to_string(),
            version: 1,
            model: json!({"type": "timeseries", "title": 42}),
        };

        swapper.use_library_panel(&broken);
        let outcome = swapper.next_swap().await.unwrap();

        assert!(matches!(outcome, SwapOutcome::Failed { .. }));
        assert_eq!(swapper.panel().title, "CPU");
        assert!(swapper.panel().library_panel.is_none());
    }

    #[tokio::test]
    async fn test_non_object_library_model_fails_without_wiping_panel() {
        let mut panel = edited_panel();
        panel.body.insert("targets".to_string(), json!([{"refId": "A"}]));
        let mut swapper = PanelSwapper::new(panel, Duration::ZERO);

        let models = [
            ("text", json!("not a panel")),
            ("list", json!([1, 2])),
            ("null", Value::Null),
        ];
        for (uid, model) in models {
            let scalar = LibraryPanel {
                uid: uid.to_string(),
                name: uid.to_string(),
                version: 1,
                model,
            };
            swapper.use_library_panel(&scalar);
            let outcome = swapper.next_swap().await.unwrap();

            assert!(
                matches!(
                    outcome,
                    SwapOutcome::Failed { ref message, .. } if message.contains("not an object")
                ),
                "{}: {:?}",
                uid,
                outcome
            );
            let panel = swapper.panel();
            assert_eq!(panel.title, "CPU");
            assert_eq!(panel.id, 7);
            assert!(panel.body.contains_key("targets"));
            assert!(panel.library_panel.is_none());
        }
    }
}
