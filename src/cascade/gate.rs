//! Dependency gate: may a field fetch yet?

use super::context::{DependencyContext, FieldKey};

/// Outcome of evaluating a field's required ancestors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Every required ancestor has a value; values are in declared order
    Ready(Vec<String>),
    /// At least one required ancestor is empty
    Unready,
}

/// Evaluate `required` against `context`. Pure.
pub fn evaluate(required: &[FieldKey], context: &DependencyContext) -> Readiness {
    let mut values = Vec::with_capacity(required.len());
    for key in required {
        match context.get(key.as_str()) {
            Some(value) if !value.is_empty() => values.push(value.to_string()),
            _ => return Readiness::Unready,
        }
    }
    Readiness::Ready(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<FieldKey> {
        names.iter().map(|n| FieldKey::from(*n)).collect()
    }

    #[test]
    fn test_root_field_is_always_ready() {
        assert_eq!(
            evaluate(&[], &DependencyContext::new()),
            Readiness::Ready(vec![])
        );
    }

    #[test]
    fn test_values_follow_declared_order() {
        let ctx = DependencyContext::new()
            .with("resource_group", "rg1")
            .with("subscription", "sub1");

        assert_eq!(
            evaluate(&keys(&["subscription", "resource_group"]), &ctx),
            Readiness::Ready(vec!["sub1".to_string(), "rg1".to_string()])
        );
    }

    #[test]
    fn test_missing_ancestor_is_unready() {
        let ctx = DependencyContext::new().with("subscription", "sub1");
        let readiness = evaluate(&keys(&["subscription", "resource_group"]), &ctx);
        assert_eq!(readiness, Readiness::Unready);
    }
}
