//! Configuration for the selector session
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/cascader/config.toml)
//! 3. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod chain;
mod logging;
mod serialization;
mod source;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use chain::{ChainConfig, FileChain, FilePanel, PanelConfig};
pub use logging::{FileLogging, LogRotation, LoggingConfig};
pub use source::{AzureConfig, FileAzure, FileSource, SourceConfig, SourceKind};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variables read by `Config::from_env`
pub const ENV_SOURCE: &str = "CASCADER_SOURCE";
pub const ENV_FIXTURE: &str = "CASCADER_FIXTURE";
pub const ENV_LOG_LEVEL: &str = "CASCADER_LOG_LEVEL";

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Where option fetches go
    pub source: SourceConfig,

    /// Azure Resource Manager settings (used when `source.kind` is azure)
    pub azure: AzureConfig,

    /// Selector chain behaviour
    pub chain: ChainConfig,

    /// Panel editor behaviour
    pub panel: PanelConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    /// Optional [source] section
    pub source: Option<FileSource>,

    /// Optional [azure] section
    pub azure: Option<FileAzure>,

    /// Optional [chain] section
    pub chain: Option<FileChain>,

    /// Optional [panel] section
    pub panel: Option<FilePanel>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/cascader/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("cascader").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };
        // Config is optional; failing to write the template is not an error
        let _ = Self::write_template_if_missing(&path);
    }

    /// Write the default template to `path` unless a file is already there.
    /// Returns true if a file was written.
    pub(crate) fn write_template_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, Self::default().to_toml())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(true)
    }

    /// Load a config file; a missing file yields defaults
    ///
    /// A file that exists but cannot be read or parsed is an error. A broken
    /// config should fail fast, not silently fall back to defaults.
    pub(crate) fn load_file_config(path: &Path) -> Result<FileConfig> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).with_context(|| {
                format!(
                    "Failed to parse {} (check quoting, true/false values and section names)",
                    path.display()
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
        }
    }

    /// Load configuration: env vars > file > defaults
    pub fn from_env() -> Result<Self> {
        let file = match Self::config_path() {
            Some(path) => Self::load_file_config(&path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed file with an environment lookup
    pub(crate) fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let source = SourceConfig::from_file(file.source, env(ENV_SOURCE), env(ENV_FIXTURE));
        let azure = AzureConfig::from_file(file.azure);
        let chain = ChainConfig::from_file(file.chain);
        let panel = PanelConfig::from_file(file.panel);
        let logging = LoggingConfig::from_file(file.logging, env(ENV_LOG_LEVEL));

        Self {
            source,
            azure,
            chain,
            panel,
            logging,
        }
    }
}
