//! Azure Monitor metrics query: the host form state for the metrics chain
//!
//! The query is what a dashboard would save. It seeds the chain on mount and
//! folds chain notifications back in, so it always mirrors the controller.

use super::{
    METRIC_DEFINITION, METRIC_NAME, METRIC_NAMESPACE, RESOURCE_GROUP, RESOURCE_NAME, SUBSCRIPTION,
};
use crate::cascade::DependencyContext;
use crate::events::ChainEvent;
use serde::{Deserialize, Serialize};

/// A dimension filter on the selected metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFilter {
    pub dimension: String,
    pub operator: String,
    pub filter: String,
}

/// Saved metrics query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMonitorQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default)]
    pub dimension_filters: Vec<DimensionFilter>,
}

impl AzureMonitorQuery {
    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            SUBSCRIPTION => Some(&mut self.subscription),
            RESOURCE_GROUP => Some(&mut self.resource_group),
            METRIC_DEFINITION => Some(&mut self.metric_definition),
            RESOURCE_NAME => Some(&mut self.resource_name),
            METRIC_NAMESPACE => Some(&mut self.metric_namespace),
            METRIC_NAME => Some(&mut self.metric_name),
            _ => None,
        }
    }

    /// Snapshot the chain fields for mounting a controller
    pub fn context(&self) -> DependencyContext {
        [
            (SUBSCRIPTION, &self.subscription),
            (RESOURCE_GROUP, &self.resource_group),
            (METRIC_DEFINITION, &self.metric_definition),
            (RESOURCE_NAME, &self.resource_name),
            (METRIC_NAMESPACE, &self.metric_namespace),
            (METRIC_NAME, &self.metric_name),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }

    /// Fold a chain notification into the query. Returns true if it changed.
    ///
    /// Dimension filters name dimensions of one particular metric, so any
    /// change to the chain drops them.
    pub fn apply(&mut self, event: &ChainEvent) -> bool {
        let (key, value) = match event {
            ChainEvent::ValueChanged { field, value, .. } => (field.as_str(), value.clone()),
            ChainEvent::Invalidated { field, .. } => (field.as_str(), None),
            _ => return false,
        };
        let Some(slot) = self.slot(key) else {
            return false;
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        self.dimension_filters.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::FieldKey;
    use chrono::Utc;

    fn changed(field: &str, value: Option<&str>) -> ChainEvent {
        ChainEvent::ValueChanged {
            timestamp: Utc::now(),
            field: FieldKey::from(field),
            value: value.map(str::to_string),
            previous: None,
        }
    }

    #[test]
    fn test_namespace_change_clears_metric_and_dimensions() {
        let mut query = AzureMonitorQuery {
            metric_namespace: Some("ns1".to_string()),
            metric_name: Some("Percentage CPU".to_string()),
            dimension_filters: vec![DimensionFilter {
                dimension: "LUN".to_string(),
                operator: "eq".to_string(),
                filter: "*".to_string(),
            }],
            ..Default::default()
        };

        assert!(query.apply(&changed(METRIC_NAMESPACE, Some("ns2"))));
        assert!(query.apply(&ChainEvent::Invalidated {
            timestamp: Utc::now(),
            field: FieldKey::from(METRIC_NAME),
        }));

        assert_eq!(query.metric_namespace.as_deref(), Some("ns2"));
        assert_eq!(query.metric_name, None);
        assert!(query.dimension_filters.is_empty());
    }

    #[test]
    fn test_context_skips_empty_fields() {
        let query = AzureMonitorQuery {
            subscription: Some("sub1".to_string()),
            resource_name: Some("vm1".to_string()),
            ..Default::default()
        };
        let ctx = query.context();
        assert_eq!(ctx.get(SUBSCRIPTION), Some("sub1"));
        assert_eq!(ctx.get(RESOURCE_NAME), Some("vm1"));
        assert_eq!(ctx.get(RESOURCE_GROUP), None);
    }

    #[test]
    fn test_unrelated_events_are_ignored() {
        let mut query = AzureMonitorQuery::default();
        assert!(!query.apply(&changed("dimension", Some("x"))));
        assert!(!query.apply(&ChainEvent::FetchIssued {
            timestamp: Utc::now(),
            field: FieldKey::from(SUBSCRIPTION),
            sequence: 1,
            ancestors: vec![],
        }));
        assert_eq!(query, AzureMonitorQuery::default());
    }

    #[test]
    fn test_saved_query_uses_camel_case() {
        let query: AzureMonitorQuery = serde_json::from_str(
            r#"{"subscription":"sub1","resourceGroup":"rg1","metricDefinition":"Microsoft.Web/sites"}"#,
        )
        .unwrap();
        assert_eq!(query.resource_group.as_deref(), Some("rg1"));
        assert!(query.dimension_filters.is_empty());
    }
}
