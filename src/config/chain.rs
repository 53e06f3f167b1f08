//! Chain and panel behaviour settings

use serde::Deserialize;
use std::time::Duration;

/// Selector chain behaviour
#[derive(Debug, Clone, Default)]
pub struct ChainConfig {
    /// Select a field's option automatically when exactly one comes back
    pub auto_select_single: bool,
    /// Dashboard template variables offered alongside fetched options
    pub template_variables: Vec<String>,
}

/// Chain settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileChain {
    pub auto_select_single: Option<bool>,
    pub template_variables: Option<Vec<String>>,
}

impl ChainConfig {
    pub fn from_file(file: Option<FileChain>) -> Self {
        let file = file.unwrap_or_default();
        Self {
            auto_select_single: file.auto_select_single.unwrap_or(false),
            template_variables: file.template_variables.unwrap_or_default(),
        }
    }
}

/// Panel editor settings
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Delay between a plugin change and the library model restore
    pub swap_delay_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self { swap_delay_ms: 500 }
    }
}

/// Panel settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FilePanel {
    pub swap_delay_ms: Option<u64>,
}

impl PanelConfig {
    pub fn from_file(file: Option<FilePanel>) -> Self {
        Self {
            swap_delay_ms: file
                .and_then(|f| f.swap_delay_ms)
                .unwrap_or(Self::default().swap_delay_ms),
        }
    }

    pub fn swap_delay(&self) -> Duration {
        Duration::from_millis(self.swap_delay_ms)
    }
}
