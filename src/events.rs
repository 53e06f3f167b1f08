// Notifications emitted by the chain controller and the panel swapper
//
// Hosts subscribe through an unbounded mpsc channel. The session prints them,
// the Azure query state folds them into the saved query, and tests assert on
// them. Using an enum keeps the observers exhaustive when a variant is added.

use crate::cascade::FieldKey;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Something happened to a field in the chain
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")] // {"type": "fetch_issued", ...}
pub enum ChainEvent {
    /// A field's value was set or cleared by a selection
    ValueChanged {
        timestamp: DateTime<Utc>,
        field: FieldKey,
        value: Option<String>,
        previous: Option<String>,
    },

    /// A dependent field was cleared because an ancestor changed
    Invalidated {
        timestamp: DateTime<Utc>,
        field: FieldKey,
    },

    /// An option fetch was started
    FetchIssued {
        timestamp: DateTime<Utc>,
        field: FieldKey,
        sequence: u64,
        ancestors: Vec<String>,
    },

    /// The latest fetch for a field committed its options
    OptionsLoaded {
        timestamp: DateTime<Utc>,
        field: FieldKey,
        sequence: u64,
        count: usize,
    },

    /// A superseded fetch finished and was dropped
    StaleDiscarded {
        timestamp: DateTime<Utc>,
        field: FieldKey,
        sequence: u64,
        current: u64,
    },

    /// The latest fetch failed; previous options were kept
    FetchFailed {
        timestamp: DateTime<Utc>,
        field: FieldKey,
        sequence: u64,
        message: String,
    },
}

impl ChainEvent {
    pub fn field(&self) -> &FieldKey {
        match self {
            Self::ValueChanged { field, .. }
            | Self::Invalidated { field, .. }
            | Self::FetchIssued { field, .. }
            | Self::OptionsLoaded { field, .. }
            | Self::StaleDiscarded { field, .. }
            | Self::FetchFailed { field, .. } => field,
        }
    }

    /// One-line summary for the session output
    pub fn summary(&self) -> String {
        match self {
            Self::ValueChanged { field, value, .. } => match value {
                Some(value) => format!("{} = {}", field, value),
                None => format!("{} cleared", field),
            },
            Self::Invalidated { field, .. } => format!("{} invalidated", field),
            Self::FetchIssued {
                field,
                sequence,
                ancestors,
                ..
            } => format!("{} fetch #{} ({})", field, sequence, ancestors.join(", ")),
            Self::OptionsLoaded {
                field,
                sequence,
                count,
                ..
            } => format!("{} loaded {} option(s) from #{}", field, count, sequence),
            Self::StaleDiscarded {
                field,
                sequence,
                current,
                ..
            } => format!("{} dropped stale #{} (current #{})", field, sequence, current),
            Self::FetchFailed {
                field,
                sequence,
                message,
                ..
            } => format!("{} fetch #{} failed: {}", field, sequence, message),
        }
    }
}

/// Something happened to the panel being edited
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelEvent {
    /// Plugin type switched ahead of a library-panel restore
    PluginChanged {
        timestamp: DateTime<Utc>,
        from: String,
        to: String,
    },

    /// A pending restore was replaced by a newer one before it ran
    SwapSuperseded {
        timestamp: DateTime<Utc>,
        library_uid: String,
    },

    /// The panel model was replaced by a library panel's model
    Restored {
        timestamp: DateTime<Utc>,
        library_uid: String,
    },

    /// Panel asked to re-run its queries and re-render
    Refreshed { timestamp: DateTime<Utc> },

    QueriesChanged { timestamp: DateTime<Utc> },

    OptionsChanged { timestamp: DateTime<Utc> },
}
