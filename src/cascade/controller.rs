//! Chain controller: the composition root for a cascading selector chain
//!
//! # Architecture
//!
//! ```text
//! set_value ─→ selection::apply ─→ gate::evaluate ─→ fetcher::issue ─┐
//!                 (cascade)          (per cleared)                    │
//!                                                                     ▼
//! commit ←── next_completion ←────────────── FuturesUnordered<in-flight>
//! ```
//!
//! All field state lives here and is only mutated through `&mut self`.
//! In-flight fetches are plain futures polled by whoever awaits
//! `next_completion`, so results are applied on the caller's task and there
//! is never a second writer.

use super::chain::Chain;
use super::context::DependencyContext;
use super::error::ChainError;
use super::fetcher::{self, CommitOutcome, CompletionFuture, FetchCompletion, OptionSource};
use super::field::FieldState;
use super::gate::{self, Readiness};
use super::option::{Choices, OptionGroup};
use super::selection;
use crate::events::ChainEvent;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Owns the fields of one chain and drives their fetches
pub struct ChainController {
    chain: Chain,
    fields: Vec<FieldState>,
    source: Arc<dyn OptionSource>,
    in_flight: FuturesUnordered<CompletionFuture>,
    events: Option<mpsc::UnboundedSender<ChainEvent>>,
    auto_select_single: bool,
}

impl ChainController {
    pub fn new(chain: Chain, source: Arc<dyn OptionSource>) -> Self {
        let fields = chain.fields().iter().cloned().map(FieldState::new).collect();
        Self {
            chain,
            fields,
            source,
            in_flight: FuturesUnordered::new(),
            events: None,
            auto_select_single: false,
        }
    }

    /// Send every state change to `sender`
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<ChainEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Select a field's only option automatically when a fetch returns exactly one
    pub fn with_auto_select(mut self, enabled: bool) -> Self {
        self.auto_select_single = enabled;
        self
    }

    pub fn fields(&self) -> &[FieldState] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldState> {
        self.chain.index_of(key).map(|i| &self.fields[i])
    }

    /// Current resolved values as a context snapshot
    pub fn context(&self) -> DependencyContext {
        self.fields
            .iter()
            .filter_map(|f| f.value().map(|v| (f.key().clone(), v.to_string())))
            .collect()
    }

    /// Number of fetches not yet completed (stale ones included)
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Fetched options for `key` plus the host's template variables
    pub fn choices(&self, key: &str, variables: &[String]) -> Option<Choices> {
        let field = self.field(key)?;
        let groups = if variables.is_empty() {
            Vec::new()
        } else {
            vec![OptionGroup::template_variables(variables)]
        };
        Some(Choices {
            options: field.options().to_vec(),
            groups,
        })
    }

    /// Seed values from a host snapshot and fetch every ready field
    ///
    /// Seeded values are taken as-is (no cascade): a saved query is assumed
    /// to be consistent with itself.
    pub fn mount(&mut self, snapshot: &DependencyContext) {
        for field in &mut self.fields {
            field.value = snapshot.get(field.key().as_str()).map(str::to_string);
        }

        let context = self.context();
        for index in 0..self.fields.len() {
            self.evaluate_and_fetch(index, &context);
        }

        tracing::debug!(
            source = self.source.name(),
            fields = self.chain.len(),
            in_flight = self.in_flight.len(),
            "Mounted chain"
        );
    }

    /// Apply a user selection; `None` (or an empty string) clears the field
    ///
    /// Returns `Ok(false)` when the value did not change.
    pub fn set_value(&mut self, key: &str, value: Option<String>) -> Result<bool, ChainError> {
        let index = self
            .chain
            .index_of(key)
            .ok_or_else(|| ChainError::UnknownField(key.to_string()))?;
        Ok(self.select_index(index, value))
    }

    fn select_index(&mut self, index: usize, value: Option<String>) -> bool {
        let Some(selection) = selection::apply(&self.chain, &mut self.fields, index, value) else {
            return false;
        };

        let field = &self.fields[index];
        tracing::debug!(
            field = %field.key(),
            value = field.value().unwrap_or(""),
            invalidated = selection.invalidated.len(),
            "Selection changed"
        );
        self.emit(ChainEvent::ValueChanged {
            timestamp: Utc::now(),
            field: field.key().clone(),
            value: field.value().map(str::to_string),
            previous: selection.previous.clone(),
        });
        for &cleared in &selection.invalidated {
            self.emit(ChainEvent::Invalidated {
                timestamp: Utc::now(),
                field: self.fields[cleared].key().clone(),
            });
        }

        // Cascade is complete; only now may new fetches be issued
        let context = self.context();
        for &cleared in &selection.invalidated {
            self.evaluate_and_fetch(cleared, &context);
        }
        true
    }

    fn evaluate_and_fetch(&mut self, index: usize, context: &DependencyContext) {
        let readiness = gate::evaluate(&self.fields[index].spec().requires, context);
        let Readiness::Ready(ancestors) = readiness else {
            self.fields[index].mark_unready();
            return;
        };

        let (request, future) =
            fetcher::issue(self.source.as_ref(), index, &mut self.fields[index], ancestors);
        tracing::debug!(
            field = %request.field,
            sequence = request.sequence,
            "Fetching options"
        );
        self.emit(ChainEvent::FetchIssued {
            timestamp: Utc::now(),
            field: request.field,
            sequence: request.sequence,
            ancestors: request.ancestors,
        });
        self.in_flight.push(future);
    }

    /// Wait for the next in-flight fetch to finish
    ///
    /// Returns `None` immediately when nothing is in flight. Cancel-safe: a
    /// completion is never lost if this future is dropped before it resolves.
    pub async fn next_completion(&mut self) -> Option<FetchCompletion> {
        self.in_flight.next().await
    }

    /// Reconcile a completion with current field state
    pub fn commit(&mut self, completion: FetchCompletion) -> CommitOutcome {
        let index = completion.request.index;
        let sequence = completion.request.sequence;
        let key = completion.request.field.clone();

        let outcome = fetcher::commit(&mut self.fields[index], completion);
        match &outcome {
            CommitOutcome::Applied { count } => {
                tracing::debug!(field = %key, sequence, count, "Options loaded");
                self.emit(ChainEvent::OptionsLoaded {
                    timestamp: Utc::now(),
                    field: key,
                    sequence,
                    count: *count,
                });
                self.auto_select(index);
            }
            CommitOutcome::Stale { current } => {
                self.emit(ChainEvent::StaleDiscarded {
                    timestamp: Utc::now(),
                    field: key,
                    sequence,
                    current: *current,
                });
            }
            CommitOutcome::Failed(err) => {
                tracing::warn!(
                    field = %key,
                    sequence,
                    source = self.source.name(),
                    "Option fetch failed: {}",
                    err
                );
                self.emit(ChainEvent::FetchFailed {
                    timestamp: Utc::now(),
                    field: key,
                    sequence,
                    message: err.to_string(),
                });
            }
        }
        outcome
    }

    /// Drive every in-flight fetch to completion, including fetches issued
    /// while settling (auto-select). Returns the number of completions seen.
    pub async fn settle(&mut self) -> usize {
        let mut seen = 0;
        while let Some(completion) = self.next_completion().await {
            self.commit(completion);
            seen += 1;
        }
        seen
    }

    fn auto_select(&mut self, index: usize) {
        if !self.auto_select_single {
            return;
        }
        let field = &self.fields[index];
        if field.value().is_some() || field.options().len() != 1 {
            return;
        }
        let value = field.options()[0].value.clone();
        tracing::debug!(field = %field.key(), value = %value, "Auto-selecting only option");
        self.select_index(index, Some(value));
    }

    fn emit(&self, event: ChainEvent) {
        if let Some(sender) = &self.events {
            // Receiver gone means nobody is watching; state is still authoritative
            let _ = sender.send(event);
        }
    }
}

impl std::fmt::Debug for ChainController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainController")
            .field("source", &self.source.name())
            .field("fields", &self.fields)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

