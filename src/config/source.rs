//! Option source configuration: which backend answers option fetches
//!
//! - Fixture: canned TOML data (embedded, or a file on disk)
//! - Azure: Azure Resource Manager over HTTPS with a bearer token

use serde::Deserialize;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Source Selection
// ─────────────────────────────────────────────────────────────────────────────

/// Which option source the session uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceKind {
    #[default]
    Fixture,
    Azure,
}

impl SourceKind {
    /// Parse from config or CLI; unknown values are rejected
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fixture" => Some(Self::Fixture),
            "azure" => Some(Self::Azure),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixture => "fixture",
            Self::Azure => "azure",
        }
    }
}

/// Source settings
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Fixture file; the embedded data set is used when unset
    pub fixture_path: Option<PathBuf>,
}

/// Source settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileSource {
    pub kind: Option<String>,
    pub fixture_path: Option<String>,
}

impl SourceConfig {
    /// Resolve env > file > default
    pub fn from_file(
        file: Option<FileSource>,
        env_kind: Option<String>,
        env_fixture: Option<String>,
    ) -> Self {
        let file = file.unwrap_or_default();

        let kind = env_kind
            .or(file.kind)
            .and_then(|s| {
                let parsed = SourceKind::parse(&s);
                if parsed.is_none() {
                    eprintln!("Warning: unknown source kind {:?}, using fixture", s);
                }
                parsed
            })
            .unwrap_or_default();

        let fixture_path = env_fixture
            .or(file.fixture_path)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Self { kind, fixture_path }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Azure Resource Manager
// ─────────────────────────────────────────────────────────────────────────────

/// Azure Resource Manager connection settings
#[derive(Debug, Clone)]
pub struct AzureConfig {
    /// ARM endpoint (public cloud by default)
    pub management_url: String,
    /// Environment variable holding the bearer token
    pub token_env: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    pub subscriptions_api_version: String,
    pub resource_groups_api_version: String,
    pub resources_api_version: String,
    pub metric_namespaces_api_version: String,
    pub metric_definitions_api_version: String,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            management_url: "https://management.azure.com".to_string(),
            token_env: "AZURE_ACCESS_TOKEN".to_string(),
            timeout_secs: 30,
            subscriptions_api_version: "2020-01-01".to_string(),
            resource_groups_api_version: "2021-04-01".to_string(),
            resources_api_version: "2021-04-01".to_string(),
            metric_namespaces_api_version: "2017-12-01-preview".to_string(),
            metric_definitions_api_version: "2018-01-01".to_string(),
        }
    }
}

/// Azure settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileAzure {
    pub management_url: Option<String>,
    pub token_env: Option<String>,
    pub timeout_secs: Option<u64>,
    pub subscriptions_api_version: Option<String>,
    pub resource_groups_api_version: Option<String>,
    pub resources_api_version: Option<String>,
    pub metric_namespaces_api_version: Option<String>,
    pub metric_definitions_api_version: Option<String>,
}

impl AzureConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileAzure>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            management_url: file.management_url.unwrap_or(defaults.management_url),
            token_env: file.token_env.unwrap_or(defaults.token_env),
            timeout_secs: file
                .timeout_secs
                .filter(|&s| s > 0)
                .unwrap_or(defaults.timeout_secs),
            subscriptions_api_version: file
                .subscriptions_api_version
                .unwrap_or(defaults.subscriptions_api_version),
            resource_groups_api_version: file
                .resource_groups_api_version
                .unwrap_or(defaults.resource_groups_api_version),
            resources_api_version: file
                .resources_api_version
                .unwrap_or(defaults.resources_api_version),
            metric_namespaces_api_version: file
                .metric_namespaces_api_version
                .unwrap_or(defaults.metric_namespaces_api_version),
            metric_definitions_api_version: file
                .metric_definitions_api_version
                .unwrap_or(defaults.metric_definitions_api_version),
        }
    }
}
