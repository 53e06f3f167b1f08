//! Azure Resource Manager option source
//!
//! Resolves each field of the metrics chain with one ARM list call:
//!
//! | field | endpoint |
//! |---|---|
//! | subscription | `/subscriptions` |
//! | resource_group | `/subscriptions/{sub}/resourceGroups` |
//! | metric_definition | `/subscriptions/{sub}/resourceGroups/{rg}/resources` (distinct types) |
//! | resource_name | same list, filtered by type |
//! | metric_namespace | `…/providers/{type}/{name}/providers/microsoft.insights/metricNamespaces` |
//! | metric_name | `…/providers/{type}/{name}/providers/microsoft.insights/metricdefinitions` |
//!
//! List responses are paged through `nextLink`.

use super::{
    METRIC_DEFINITION, METRIC_NAME, METRIC_NAMESPACE, RESOURCE_GROUP, RESOURCE_NAME, SUBSCRIPTION,
};
use crate::cascade::{FetchError, FieldKey, OptionFuture, OptionSource, SelectOption};
use crate::config::AzureConfig;
use futures::FutureExt;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Upper bound on `nextLink` pages followed for one fetch
const MAX_PAGES: usize = 20;

/// What to pull out of each list item
#[derive(Debug, Clone, PartialEq, Eq)]
enum Extract {
    Subscriptions,
    Names,
    ResourceTypes,
    ResourcesOfType(String),
    Namespaces,
    Metrics,
}

/// A resolved ARM list call
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArmRequest {
    path: String,
    query: Vec<(&'static str, String)>,
    extract: Extract,
}

/// One page of an ARM list response
#[derive(Debug, Deserialize)]
struct ArmPage {
    #[serde(default)]
    value: Vec<Value>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

/// Option source backed by the Azure Resource Manager REST API
#[derive(Clone)]
pub struct ArmSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
    versions: ApiVersions,
}

#[derive(Debug, Clone)]
struct ApiVersions {
    subscriptions: String,
    resource_groups: String,
    resources: String,
    metric_namespaces: String,
    metric_definitions: String,
}

impl ArmSource {
    /// Create a source reading the bearer token from `config.token_env`
    pub fn from_config(config: &AzureConfig) -> Result<Self, FetchError> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            FetchError::NotConfigured(format!(
                "set {} to an ARM access token (az account get-access-token)",
                config.token_env
            ))
        })?;
        Self::with_token(config, token)
    }

    pub fn with_token(config: &AzureConfig, token: String) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized ARM source: {} (timeout {}s)",
            config.management_url,
            config.timeout_secs
        );

        Ok(Self {
            client,
            base_url: config.management_url.trim_end_matches('/').to_string(),
            token,
            versions: ApiVersions {
                subscriptions: config.subscriptions_api_version.clone(),
                resource_groups: config.resource_groups_api_version.clone(),
                resources: config.resources_api_version.clone(),
                metric_namespaces: config.metric_namespaces_api_version.clone(),
                metric_definitions: config.metric_definitions_api_version.clone(),
            },
        })
    }

    /// Map a field and its ancestor values to the ARM call that lists its options
    fn request_for(&self, field: &str, ancestors: &[String]) -> Result<ArmRequest, FetchError> {
        let arg = |i: usize| {
            ancestors.get(i).map(String::as_str).ok_or_else(|| {
                FetchError::Unavailable(format!(
                    "{} needs {} ancestor values, got {}",
                    field,
                    i + 1,
                    ancestors.len()
                ))
            })
        };
        let v = &self.versions;

        let request = match field {
            SUBSCRIPTION => ArmRequest {
                path: "/subscriptions".to_string(),
                query: vec![("api-version", v.subscriptions.clone())],
                extract: Extract::Subscriptions,
            },
            RESOURCE_GROUP => ArmRequest {
                path: format!("/subscriptions/{}/resourceGroups", arg(0)?),
                query: vec![("api-version", v.resource_groups.clone())],
                extract: Extract::Names,
            },
            METRIC_DEFINITION => ArmRequest {
                path: format!("/subscriptions/{}/resourceGroups/{}/resources", arg(0)?, arg(1)?),
                query: vec![("api-version", v.resources.clone())],
                extract: Extract::ResourceTypes,
            },
            RESOURCE_NAME => ArmRequest {
                path: format!("/subscriptions/{}/resourceGroups/{}/resources", arg(0)?, arg(1)?),
                query: vec![("api-version", v.resources.clone())],
                extract: Extract::ResourcesOfType(arg(2)?.to_string()),
            },
            METRIC_NAMESPACE => ArmRequest {
                path: format!(
                    "{}/providers/microsoft.insights/metricNamespaces",
                    resource_uri(arg(0)?, arg(1)?, arg(2)?, arg(3)?)
                ),
                query: vec![("api-version", v.metric_namespaces.clone())],
                extract: Extract::Namespaces,
            },
            METRIC_NAME => ArmRequest {
                path: format!(
                    "{}/providers/microsoft.insights/metricdefinitions",
                    resource_uri(arg(0)?, arg(1)?, arg(2)?, arg(3)?)
                ),
                query: vec![
                    ("api-version", v.metric_definitions.clone()),
                    ("metricnamespace", arg(4)?.to_string()),
                ],
                extract: Extract::Metrics,
            },
            other => {
                return Err(FetchError::Unavailable(format!(
                    "no ARM endpoint for field '{}'",
                    other
                )))
            }
        };
        Ok(request)
    }
}

fn resource_uri(subscription: &str, group: &str, resource_type: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
        subscription, group, resource_type, name
    )
}

impl OptionSource for ArmSource {
    fn name(&self) -> &'static str {
        "azure-resource-manager"
    }

    fn fetch_options(&self, field: &FieldKey, ancestors: &[String]) -> OptionFuture {
        let request = match self.request_for(field.as_str(), ancestors) {
            Ok(request) => request,
            Err(err) => return futures::future::ready(Err(err)).boxed(),
        };
        let source = self.clone();
        async move { source.list(request).await }.boxed()
    }
}

/// Log a list cut short at `MAX_PAGES`; `last` is the final page fetched
fn warn_if_truncated(path: &str, last: &ArmPage, items: usize) -> bool {
    if last.next_link.is_none() {
        return false;
    }
    tracing::warn!(
        path = %path,
        pages = MAX_PAGES,
        items,
        "Option list truncated: more pages remain"
    );
    true
}

impl ArmSource {
    async fn list(&self, request: ArmRequest) -> Result<Vec<SelectOption>, FetchError> {
        let mut items = Vec::new();

        let first = self
            .client
            .get(format!("{}{}", self.base_url, request.path))
            .query(&request.query);
        let mut page = self.send(first).await?;

        for _ in 1..MAX_PAGES {
            items.append(&mut page.value);
            let Some(next) = page.next_link.take() else {
                break;
            };
            // nextLink is absolute and already carries its query string
            page = self.send(self.client.get(next)).await?;
        }
        items.append(&mut page.value);

        warn_if_truncated(&request.path, &page, items.len());

        extract_options(&request.extract, &items)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<ArmPage, FetchError> {
        let response = builder
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ArmPage>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

fn str_at<'a>(item: &'a Value, pointer: &str) -> Option<&'a str> {
    item.pointer(pointer).and_then(Value::as_str)
}

/// Turn ARM list items into options for the requested field
fn extract_options(extract: &Extract, items: &[Value]) -> Result<Vec<SelectOption>, FetchError> {
    let missing = |what: &str| FetchError::Decode(format!("list item without {}", what));

    match extract {
        Extract::Subscriptions => items
            .iter()
            .map(|item| {
                let id = str_at(item, "/subscriptionId").ok_or_else(|| missing("subscriptionId"))?;
                let label = str_at(item, "/displayName").unwrap_or(id);
                Ok(SelectOption::new(id, label))
            })
            .collect(),
        Extract::Names => items
            .iter()
            .map(|item| {
                str_at(item, "/name")
                    .map(SelectOption::from_value)
                    .ok_or_else(|| missing("name"))
            })
            .collect(),
        Extract::ResourceTypes => {
            let mut seen = HashSet::new();
            let mut options = Vec::new();
            for item in items {
                let resource_type = str_at(item, "/type").ok_or_else(|| missing("type"))?;
                if seen.insert(resource_type.to_lowercase()) {
                    options.push(SelectOption::from_value(resource_type));
                }
            }
            Ok(options)
        }
        Extract::ResourcesOfType(wanted) => Ok(items
            .iter()
            .filter(|item| {
                str_at(item, "/type").is_some_and(|t| t.eq_ignore_ascii_case(wanted))
            })
            .filter_map(|item| str_at(item, "/name"))
            .map(SelectOption::from_value)
            .collect()),
        Extract::Namespaces => items
            .iter()
            .map(|item| {
                str_at(item, "/properties/metricNamespaceName")
                    .or_else(|| str_at(item, "/name"))
                    .map(SelectOption::from_value)
                    .ok_or_else(|| missing("metricNamespaceName"))
            })
            .collect(),
        Extract::Metrics => items
            .iter()
            .map(|item| {
                let value = str_at(item, "/name/value").ok_or_else(|| missing("name.value"))?;
                let label = str_at(item, "/name/localizedValue").unwrap_or(value);
                Ok(SelectOption::new(value, label))
            })
            .collect(),
    }
}
