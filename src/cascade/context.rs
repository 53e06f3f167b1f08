//! Field keys and the dependency context snapshot

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier of a field within a chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(String);

impl FieldKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for FieldKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Resolved values of fields, keyed by field
///
/// This is the snapshot a host form hands to the controller on mount and the
/// view the controller exposes back. Empty strings are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyContext {
    values: BTreeMap<FieldKey, String>,
}

impl DependencyContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with(mut self, key: impl Into<FieldKey>, value: impl Into<String>) -> Self {
        self.set(key.into(), Some(value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set or clear a value; `Some("")` clears
    pub fn set(&mut self, key: FieldKey, value: Option<String>) {
        match value.filter(|v| !v.is_empty()) {
            Some(value) => {
                self.values.insert(key, value);
            }
            None => {
                self.values.remove(&key);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<FieldKey>, V: Into<String>> FromIterator<(K, V)> for DependencyContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Self::new();
        for (key, value) in iter {
            context.set(key.into(), Some(value.into()));
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_value_clears() {
        let mut ctx = DependencyContext::new().with("subscription", "sub1");
        assert_eq!(ctx.get("subscription"), Some("sub1"));

        ctx.set(FieldKey::from("subscription"), Some(String::new()));
        assert_eq!(ctx.get("subscription"), None);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_context_serializes_as_plain_map() {
        let ctx = DependencyContext::new()
            .with("resource_group", "rg1")
            .with("subscription", "sub1");
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, r#"{"resource_group":"rg1","subscription":"sub1"}"#);
    }
}
