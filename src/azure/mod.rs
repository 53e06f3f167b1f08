//! Azure Monitor metrics query chain
//!
//! The metrics editor picks, in order: subscription, resource group, metric
//! definition (resource type), resource name, metric namespace and metric
//! name. Each step needs every value chosen before it.

pub mod client;
pub mod query;

use crate::cascade::{Chain, ChainError, FieldSpec};

pub use client::ArmSource;
pub use query::AzureMonitorQuery;

pub const SUBSCRIPTION: &str = "subscription";
pub const RESOURCE_GROUP: &str = "resource_group";
pub const METRIC_DEFINITION: &str = "metric_definition";
pub const RESOURCE_NAME: &str = "resource_name";
pub const METRIC_NAMESPACE: &str = "metric_namespace";
pub const METRIC_NAME: &str = "metric_name";

/// Field keys in chain order
pub const FIELDS: [&str; 6] = [
    SUBSCRIPTION,
    RESOURCE_GROUP,
    METRIC_DEFINITION,
    RESOURCE_NAME,
    METRIC_NAMESPACE,
    METRIC_NAME,
];

/// Build the metrics chain; every field requires all fields before it
pub fn metrics_chain() -> Result<Chain, ChainError> {
    let labels = [
        "Subscription",
        "Resource Group",
        "Resource Type",
        "Resource Name",
        "Metric Namespace",
        "Metric",
    ];

    FIELDS
        .iter()
        .zip(labels)
        .enumerate()
        .fold(Chain::builder(), |builder, (i, (key, label))| {
            builder.field(FieldSpec::new(*key, label).requires(FIELDS[..i].iter().copied()))
        })
        .build()
}
