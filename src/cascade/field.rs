//! Per-field state owned by the controller

use super::chain::FieldSpec;
use super::context::FieldKey;
use super::option::{find_option, SelectOption};
use serde::Serialize;

/// Where a field is in its fetch lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPhase {
    /// Required ancestors are incomplete; no options, no fetch
    Unready,
    /// A fetch is in flight for the current ancestor values
    Loading,
    /// The latest fetch settled (successfully, or failed with prior options kept)
    Ready,
}

impl FieldPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unready => "unready",
            Self::Loading => "loading",
            Self::Ready => "ready",
        }
    }
}

/// Mutable state of one field
#[derive(Debug, Clone)]
pub struct FieldState {
    spec: FieldSpec,
    pub(super) value: Option<String>,
    pub(super) options: Vec<SelectOption>,
    pub(super) phase: FieldPhase,
    /// Sequence number of the most recent request; bumped on issue and on invalidation
    pub(super) sequence: u64,
    pub(super) last_error: Option<String>,
    pub(super) fetches_issued: u64,
}

impl FieldState {
    pub fn new(spec: FieldSpec) -> Self {
        Self {
            spec,
            value: None,
            options: Vec::new(),
            phase: FieldPhase::Unready,
            sequence: 0,
            last_error: None,
            fetches_issued: 0,
        }
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn key(&self) -> &FieldKey {
        &self.spec.key
    }

    pub fn label(&self) -> &str {
        &self.spec.label
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// The option matching the current value, if it is among the fetched options
    pub fn selected(&self) -> Option<&SelectOption> {
        self.value
            .as_deref()
            .and_then(|value| find_option(&self.options, value))
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn phase(&self) -> FieldPhase {
        self.phase
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of fetches ever issued for this field
    pub fn fetches_issued(&self) -> u64 {
        self.fetches_issued
    }

    /// Clear value and options and supersede any in-flight request
    pub(super) fn invalidate(&mut self) {
        self.value = None;
        self.mark_unready();
    }

    /// Drop options and supersede any in-flight request, keeping the value
    pub(super) fn mark_unready(&mut self) {
        self.options.clear();
        self.phase = FieldPhase::Unready;
        self.last_error = None;
        self.sequence += 1;
    }
}
