//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::{Config, ENV_FIXTURE, ENV_LOG_LEVEL, ENV_SOURCE};

impl Config {
    /// Serialize the fixture path, or a commented-out example when unset
    fn fixture_path_to_toml(&self) -> String {
        match &self.source.fixture_path {
            Some(path) => format!("fixture_path = {:?}", path.display().to_string()),
            None => "# fixture_path = \"demos/azure_monitor.toml\"  # embedded data when unset"
                .to_string(),
        }
    }

    /// Render the full config file
    ///
    /// Strings go through `{:?}` so quotes and backslashes come out as valid
    /// TOML basic strings.
    pub fn to_toml(&self) -> String {
        format!(
            r#"# cascader configuration
#
# Environment overrides: {env_source}, {env_fixture}, {env_log_level}

# Where option fetches go
[source]
kind = "{kind}"  # fixture, azure
{fixture_path}

# Azure Resource Manager (used when kind = "azure")
# The bearer token is read from the environment variable named by token_env
[azure]
management_url = {management_url:?}
token_env = {token_env:?}
timeout_secs = {timeout_secs}
subscriptions_api_version = {subscriptions:?}
resource_groups_api_version = {resource_groups:?}
resources_api_version = {resources:?}
metric_namespaces_api_version = {metric_namespaces:?}
metric_definitions_api_version = {metric_definitions:?}

# Selector chain behaviour
[chain]
# Select a field automatically when its fetch returns exactly one option
auto_select_single = {auto_select}
# Dashboard template variables offered alongside fetched options
template_variables = {variables:?}

# Panel editor
[panel]
# Delay between switching the plugin and restoring a library panel's model
swap_delay_ms = {swap_delay_ms}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = {log_level:?}
# JSON file logging (in addition to stderr)
file_enabled = {log_file_enabled}
file_dir = {log_file_dir:?}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = {log_file_prefix:?}
"#,
            env_source = ENV_SOURCE,
            env_fixture = ENV_FIXTURE,
            env_log_level = ENV_LOG_LEVEL,
            kind = self.source.kind.as_str(),
            fixture_path = self.fixture_path_to_toml(),
            management_url = self.azure.management_url,
            token_env = self.azure.token_env,
            timeout_secs = self.azure.timeout_secs,
            subscriptions = self.azure.subscriptions_api_version,
            resource_groups = self.azure.resource_groups_api_version,
            resources = self.azure.resources_api_version,
            metric_namespaces = self.azure.metric_namespaces_api_version,
            metric_definitions = self.azure.metric_definitions_api_version,
            auto_select = self.chain.auto_select_single,
            variables = self.chain.template_variables,
            swap_delay_ms = self.panel.swap_delay_ms,
            log_level = self.logging.level,
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = self.logging.file_dir.display().to_string(),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = self.logging.file_prefix,
        )
    }
}
