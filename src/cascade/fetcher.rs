//! Option fetching and stale-result reconciliation
//!
//! # Supersession
//!
//! Every request carries the field's sequence number at the time it was
//! issued. The field bumps its sequence on each new request and on each
//! invalidation, so a completion can only commit while its number is still
//! the field's current one. Nothing is cancelled; late results are dropped.

use super::context::FieldKey;
use super::error::FetchError;
use super::field::{FieldPhase, FieldState};
use super::option::SelectOption;
use futures::future::BoxFuture;
use futures::FutureExt;

/// Future returned by a source for one fetch
pub type OptionFuture = BoxFuture<'static, Result<Vec<SelectOption>, FetchError>>;

/// Future the controller polls for one in-flight request
pub type CompletionFuture = BoxFuture<'static, FetchCompletion>;

/// Data-source client: resolves a field's options from its ancestor values
///
/// Implementations own their timeouts and retries. The returned future must
/// be `'static`, so sources clone whatever they need (HTTP clients are cheap
/// to clone) before building it.
pub trait OptionSource: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &'static str;

    /// Fetch options for `field` given its ancestor values in declared order
    fn fetch_options(&self, field: &FieldKey, ancestors: &[String]) -> OptionFuture;
}

/// Identity of one issued request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub index: usize,
    pub field: FieldKey,
    pub sequence: u64,
    pub ancestors: Vec<String>,
}

/// A finished request, not yet reconciled against field state
#[derive(Debug)]
pub struct FetchCompletion {
    pub request: FetchRequest,
    pub result: Result<Vec<SelectOption>, FetchError>,
}

/// What committing a completion did to the field
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Options replaced with `count` entries
    Applied { count: usize },
    /// A newer request (or an invalidation) superseded this one
    Stale { current: u64 },
    /// Source failed; previous options were kept
    Failed(FetchError),
}

/// Start a fetch for `state`, bumping its sequence first
pub fn issue(
    source: &dyn OptionSource,
    index: usize,
    state: &mut FieldState,
    ancestors: Vec<String>,
) -> (FetchRequest, CompletionFuture) {
    state.sequence += 1;
    state.fetches_issued += 1;
    state.phase = FieldPhase::Loading;

    let request = FetchRequest {
        index,
        field: state.key().clone(),
        sequence: state.sequence,
        ancestors,
    };

    let fetch = source.fetch_options(&request.field, &request.ancestors);
    let tagged = request.clone();
    let future = fetch
        .map(move |result| FetchCompletion {
            request: tagged,
            result,
        })
        .boxed();

    (request, future)
}

/// Reconcile a completion with the field it was issued for
pub fn commit(state: &mut FieldState, completion: FetchCompletion) -> CommitOutcome {
    if completion.request.sequence != state.sequence {
        return CommitOutcome::Stale {
            current: state.sequence,
        };
    }

    state.phase = FieldPhase::Ready;
    match completion.result {
        Ok(options) => {
            let count = options.len();
            state.options = options;
            state.last_error = None;
            CommitOutcome::Applied { count }
        }
        Err(err) => {
            state.last_error = Some(err.to_string());
            CommitOutcome::Failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::chain::FieldSpec;
    use futures::future;

    struct Static(Vec<SelectOption>);

    impl OptionSource for Static {
        fn name(&self) -> &'static str {
            "static"
        }

        fn fetch_options(&self, _field: &FieldKey, _ancestors: &[String]) -> OptionFuture {
            future::ready(Ok(self.0.clone())).boxed()
        }
    }

    fn completion(
        request: &FetchRequest,
        result: Result<Vec<SelectOption>, FetchError>,
    ) -> FetchCompletion {
        FetchCompletion {
            request: request.clone(),
            result,
        }
    }

    #[tokio::test]
    async fn test_issue_then_commit_applies() {
        let source = Static(vec![SelectOption::from_value("rg1")]);
        let mut state = FieldState::new(FieldSpec::new("resource_group", "Resource Group"));

        let (request, future) = issue(&source, 1, &mut state, vec!["sub1".to_string()]);
        assert_eq!(request.sequence, 1);
        assert_eq!(state.phase(), FieldPhase::Loading);

        let outcome = commit(&mut state, future.await);
        assert_eq!(outcome, CommitOutcome::Applied { count: 1 });
        assert_eq!(state.phase(), FieldPhase::Ready);
        assert_eq!(state.options()[0].value, "rg1");
    }

    #[test]
    fn test_superseded_completion_is_stale() {
        let source = Static(vec![]);
        let mut state = FieldState::new(FieldSpec::new("resource_group", "Resource Group"));

        let (first, _) = issue(&source, 1, &mut state, vec!["sub1".to_string()]);
        let (second, _) = issue(&source, 1, &mut state, vec!["sub2".to_string()]);

        let outcome = commit(
            &mut state,
            completion(&first, Ok(vec![SelectOption::from_value("old")])),
        );
        assert_eq!(outcome, CommitOutcome::Stale { current: 2 });
        assert!(state.options().is_empty());
        assert_eq!(state.phase(), FieldPhase::Loading);

        let outcome = commit(
            &mut state,
            completion(&second, Ok(vec![SelectOption::from_value("new")])),
        );
        assert_eq!(outcome, CommitOutcome::Applied { count: 1 });
        assert_eq!(state.options()[0].value, "new");
    }

    #[test]
    fn test_failure_keeps_previous_options() {
        let source = Static(vec![]);
        let mut state = FieldState::new(FieldSpec::new("metric_namespace", "Metric Namespace"));

        let (first, _) = issue(&source, 0, &mut state, vec![]);
        commit(
            &mut state,
            completion(&first, Ok(vec![SelectOption::from_value("ns1")])),
        );

        let (second, _) = issue(&source, 0, &mut state, vec![]);
        let outcome = commit(
            &mut state,
            completion(&second, Err(FetchError::Network("timeout".to_string()))),
        );

        assert!(matches!(outcome, CommitOutcome::Failed(_)));
        assert_eq!(state.options().len(), 1);
        assert_eq!(state.phase(), FieldPhase::Ready);
        assert_eq!(state.last_error(), Some("Network error: timeout"));
    }

    #[test]
    fn test_invalidation_supersedes_in_flight() {
        let source = Static(vec![]);
        let mut state = FieldState::new(FieldSpec::new("resource_name", "Resource Name"));

        let (request, _) = issue(&source, 3, &mut state, vec![]);
        state.invalidate();

        let outcome = commit(
            &mut state,
            completion(&request, Ok(vec![SelectOption::from_value("vm1")])),
        );
        assert!(matches!(outcome, CommitOutcome::Stale { .. }));
        assert_eq!(state.phase(), FieldPhase::Unready);
        assert!(state.options().is_empty());
    }
}
