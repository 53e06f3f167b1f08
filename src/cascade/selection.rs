//! Selection handling: apply a value and cascade invalidation downstream

use super::chain::Chain;
use super::field::FieldState;

/// Result of applying a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub previous: Option<String>,
    /// Every dependent field that was cleared, in chain order
    pub invalidated: Vec<usize>,
}

/// Set `fields[index]` to `value` and clear every dependent field
///
/// Returns `None` when the value is unchanged. Empty strings clear. The whole
/// cascade happens before this returns, so no caller can observe a state where
/// a child was cleared but a grandchild still holds a value.
pub fn apply(
    chain: &Chain,
    fields: &mut [FieldState],
    index: usize,
    value: Option<String>,
) -> Option<Selection> {
    let value = value.filter(|v| !v.is_empty());
    if fields[index].value == value {
        return None;
    }

    let previous = std::mem::replace(&mut fields[index].value, value);

    let invalidated = chain.descendants(index);
    for &descendant in &invalidated {
        fields[descendant].invalidate();
    }

    Some(Selection {
        index,
        previous,
        invalidated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::chain::FieldSpec;
    use crate::cascade::field::FieldPhase;
    use crate::cascade::option::SelectOption;

    fn chain() -> Chain {
        Chain::builder()
            .field(FieldSpec::new("a", "A"))
            .field(FieldSpec::new("b", "B").requires(["a"]))
            .field(FieldSpec::new("c", "C").requires(["b"]))
            .field(FieldSpec::new("side", "Side"))
            .build()
            .unwrap()
    }

    fn populated(chain: &Chain) -> Vec<FieldState> {
        chain
            .fields()
            .iter()
            .map(|spec| {
                let mut state = FieldState::new(spec.clone());
                state.value = Some(format!("{}-value", spec.key));
                state.options = vec![SelectOption::from_value(format!("{}-value", spec.key))];
                state.phase = FieldPhase::Ready;
                state
            })
            .collect()
    }

    #[test]
    fn test_change_clears_all_descendants() {
        let chain = chain();
        let mut fields = populated(&chain);

        let selection = apply(&chain, &mut fields, 0, Some("other".to_string())).unwrap();

        assert_eq!(selection.previous.as_deref(), Some("a-value"));
        assert_eq!(selection.invalidated, vec![1, 2]);
        for cleared in &fields[1..3] {
            assert_eq!(cleared.value(), None);
            assert!(cleared.options().is_empty());
            assert_eq!(cleared.phase(), FieldPhase::Unready);
        }
        // unrelated field untouched
        assert_eq!(fields[3].value(), Some("side-value"));
        assert_eq!(fields[3].options().len(), 1);
    }

    #[test]
    fn test_same_value_is_not_a_change() {
        let chain = chain();
        let mut fields = populated(&chain);

        assert!(apply(&chain, &mut fields, 0, Some("a-value".to_string())).is_none());
        assert_eq!(fields[2].value(), Some("c-value"));
    }

    #[test]
    fn test_empty_string_clears() {
        let chain = chain();
        let mut fields = populated(&chain);

        let selection = apply(&chain, &mut fields, 1, Some(String::new())).unwrap();
        assert_eq!(fields[1].value(), None);
        assert_eq!(selection.invalidated, vec![2]);
        // the changed field keeps its own options
        assert_eq!(fields[1].options().len(), 1);
    }
}
