//! Chain declaration: fields and their dependency edges
//!
//! A chain is an ordered list of fields. Each field names the earlier fields
//! whose values it needs before its options can be fetched. Edges may only
//! point backwards, which keeps data and invalidation flowing downstream.

use super::context::FieldKey;
use super::error::ChainError;
use std::collections::HashSet;

/// Declaration of a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub label: String,
    /// Required ancestor keys, in the order the data source expects them
    pub requires: Vec<FieldKey>,
}

impl FieldSpec {
    pub fn new(key: impl Into<FieldKey>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            requires: Vec::new(),
        }
    }

    pub fn requires<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<FieldKey>,
    {
        self.requires = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// A validated, ordered set of fields
#[derive(Debug, Clone)]
pub struct Chain {
    fields: Vec<FieldSpec>,
}

impl Chain {
    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key.as_str() == key)
    }

    /// Indices of every field that depends on `index`, directly or transitively
    ///
    /// Because edges only point backwards, one forward pass over the fields
    /// after `index` finds the full closure.
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        let mut dirty: HashSet<&FieldKey> = HashSet::new();
        dirty.insert(&self.fields[index].key);

        let mut result = Vec::new();
        for (offset, field) in self.fields[index + 1..].iter().enumerate() {
            if field.requires.iter().any(|r| dirty.contains(r)) {
                dirty.insert(&field.key);
                result.push(index + 1 + offset);
            }
        }
        result
    }
}

/// Builder that checks edges as fields are added
#[derive(Debug, Default)]
pub struct ChainBuilder {
    fields: Vec<FieldSpec>,
}

impl ChainBuilder {
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn build(self) -> Result<Chain, ChainError> {
        self.validate()?;
        Ok(Chain {
            fields: self.fields,
        })
    }

    fn validate(&self) -> Result<(), ChainError> {
        let mut seen: HashSet<&FieldKey> = HashSet::new();
        let all: HashSet<&FieldKey> = self.fields.iter().map(|f| &f.key).collect();

        for field in &self.fields {
            for required in &field.requires {
                if seen.contains(required) {
                    continue;
                }
                return Err(if all.contains(required) {
                    ChainError::ForwardDependency {
                        field: field.key.to_string(),
                        requires: required.to_string(),
                    }
                } else {
                    ChainError::UnknownDependency {
                        field: field.key.to_string(),
                        requires: required.to_string(),
                    }
                });
            }
            if !seen.insert(&field.key) {
                return Err(ChainError::DuplicateField(field.key.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(keys: &[&str]) -> Chain {
        let mut builder = Chain::builder();
        for (i, key) in keys.iter().enumerate() {
            builder = builder.field(FieldSpec::new(*key, *key).requires(keys[..i].iter().copied()));
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_descendants_are_transitive() {
        // c depends only on b, but b depends on a: clearing a must reach c
        let chain = Chain::builder()
            .field(FieldSpec::new("a", "A"))
            .field(FieldSpec::new("b", "B").requires(["a"]))
            .field(FieldSpec::new("c", "C").requires(["b"]))
            .field(FieldSpec::new("d", "D"))
            .build()
            .unwrap();

        assert_eq!(chain.descendants(0), vec![1, 2]);
        assert_eq!(chain.descendants(1), vec![2]);
        assert!(chain.descendants(2).is_empty());
        assert!(chain.descendants(3).is_empty());
    }

    #[test]
    fn test_linear_chain_descendants() {
        let chain = linear(&["a", "b", "c", "d"]);
        assert_eq!(chain.descendants(1), vec![2, 3]);
        assert_eq!(chain.index_of("c"), Some(2));
        assert_eq!(chain.index_of("z"), None);
    }

    #[test]
    fn test_rejects_forward_dependency() {
        let err = Chain::builder()
            .field(FieldSpec::new("a", "A").requires(["b"]))
            .field(FieldSpec::new("b", "B"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::ForwardDependency {
                field: "a".to_string(),
                requires: "b".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_unknown_and_duplicate() {
        let err = Chain::builder()
            .field(FieldSpec::new("a", "A").requires(["ghost"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ChainError::UnknownDependency { .. }));

        let err = Chain::builder()
            .field(FieldSpec::new("a", "A"))
            .field(FieldSpec::new("a", "A again"))
            .build()
            .unwrap_err();
        assert_eq!(err, ChainError::DuplicateField("a".to_string()));
    }

    #[test]
    fn test_self_dependency_is_forward() {
        let err = Chain::builder()
            .field(FieldSpec::new("a", "A").requires(["a"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ChainError::ForwardDependency { .. }));
    }
}
