// Fixture option source: canned data loaded from TOML
//
// Used when no cloud access is configured, for demos, and for exercising
// the controller against realistic latencies. Each entry maps a field and
// its ancestor values to an option list (or to an injected failure).
//
// Run with: cascader run --source fixture --fixture demos/azure_monitor.toml

use crate::cascade::{FetchError, FieldKey, OptionFuture, OptionSource, SelectOption};
use crate::library_panel::LibraryPanel;
use anyhow::{Context, Result};
use futures::FutureExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Built-in data set used when no fixture path is configured
pub const EMBEDDED_FIXTURE: &str = include_str!("../demos/azure_monitor.toml");

/// One canned response
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureEntry {
    pub field: String,
    #[serde(default)]
    pub ancestors: Vec<String>,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    /// When set, the fetch fails with this message instead of answering
    pub fail: Option<String>,
}

/// Fixture file layout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureFile {
    /// Simulated latency per field key; `default` applies to the rest
    #[serde(default)]
    pub latency_ms: HashMap<String, u64>,
    #[serde(default)]
    pub entry: Vec<FixtureEntry>,
    #[serde(default)]
    pub library_panels: Vec<LibraryPanel>,
}

impl FixtureFile {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse fixture TOML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("In fixture {}", path.display()))
    }

    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_FIXTURE)
    }
}

/// Option source answering from a fixture file
#[derive(Debug, Clone)]
pub struct FixtureSource {
    entries: HashMap<(String, Vec<String>), FixtureEntry>,
    latency: HashMap<String, Duration>,
    default_latency: Duration,
}

impl FixtureSource {
    pub fn new(file: &FixtureFile) -> Self {
        let entries = file
            .entry
            .iter()
            .map(|e| ((e.field.clone(), e.ancestors.clone()), e.clone()))
            .collect();

        let mut latency: HashMap<String, Duration> = file
            .latency_ms
            .iter()
            .map(|(field, ms)| (field.clone(), Duration::from_millis(*ms)))
            .collect();
        let default_latency = latency.remove("default").unwrap_or_default();

        Self {
            entries,
            latency,
            default_latency,
        }
    }

    fn latency_for(&self, field: &str) -> Duration {
        self.latency
            .get(field)
            .copied()
            .unwrap_or(self.default_latency)
    }

    fn answer(&self, field: &str, ancestors: &[String]) -> Result<Vec<SelectOption>, FetchError> {
        match self.entries.get(&(field.to_string(), ancestors.to_vec())) {
            Some(FixtureEntry {
                fail: Some(message),
                ..
            }) => Err(FetchError::Unavailable(message.clone())),
            Some(entry) => Ok(entry.options.clone()),
            // An unknown combination is simply an empty list, like an empty resource group
            None => Ok(Vec::new()),
        }
    }
}

impl OptionSource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn fetch_options(&self, field: &FieldKey, ancestors: &[String]) -> OptionFuture {
        let answer = self.answer(field.as_str(), ancestors);
        let delay = self.latency_for(field.as_str());
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            answer
        }
        .boxed()
    }
}
