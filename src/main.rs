// cascader - dependent selector chains
//
// Drives the Azure Monitor metrics picker (subscription, resource group,
// resource type, resource name, metric namespace, metric) from the terminal.
// Each field's options are fetched from its ancestors' values; changing a
// field clears everything downstream and late answers are dropped.
//
// Architecture:
// - cascade: generic chain state, readiness gate, fetch reconciliation
// - azure: the metrics chain, its saved query and the ARM option source
// - fixture: canned option source for offline use
// - library_panel: "use library panel instead" with a delayed restore
// - session: stdin command loop wiring the above together
// - Event system: unbounded mpsc channels from controller/swapper to session

mod azure;
mod cascade;
mod cli;
mod config;
mod events;
mod fixture;
mod library_panel;
mod logging;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, LogRotation, LoggingConfig, SourceKind};
use fixture::{FixtureFile, FixtureSource};
use library_panel::{PanelModel, PanelSwapper};
use logging::{CaptureLayer, LogBuffer};
use session::{Session, SessionParts};
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[tokio::main]
async fn main() -> Result<()> {
    // Config commands exit early; everything else starts a session
    let Some(args) = cli::handle_cli(cli::Cli::parse())? else {
        return Ok(());
    };

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let mut config = Config::from_env()?;
    args.apply(&mut config);

    let log_buffer = LogBuffer::new();
    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _file_guard = init_tracing(&config.logging, &log_buffer);

    let fixture = match &config.source.fixture_path {
        Some(path) => FixtureFile::load(path)?,
        None => FixtureFile::embedded()?,
    };

    let source: Arc<dyn cascade::OptionSource> = match config.source.kind {
        SourceKind::Fixture => Arc::new(FixtureSource::new(&fixture)),
        SourceKind::Azure => Arc::new(
            azure::ArmSource::from_config(&config.azure)
                .context("Cannot start the Azure option source")?,
        ),
    };

    let query = match &args.query {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read query {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse query {}", path.display()))?
        }
        None => azure::AzureMonitorQuery::default(),
    };

    tracing::info!(
        source = source.name(),
        library_panels = fixture.library_panels.len(),
        auto_select = config.chain.auto_select_single,
        "Starting session"
    );

    let controller = cascade::ChainController::new(azure::metrics_chain()?, source)
        .with_auto_select(config.chain.auto_select_single);
    let swapper = PanelSwapper::new(
        PanelModel::new(1, "timeseries", "New panel"),
        config.panel.swap_delay(),
    );

    Session::new(SessionParts {
        controller,
        swapper,
        query,
        library: fixture.library_panels,
        variables: config.chain.template_variables.clone(),
        logs: log_buffer,
    })
    .run()
    .await
}

/// Install the global subscriber
///
/// Precedence: RUST_LOG env var > config file > default "info". Every event
/// passing the filter lands in `buffer` (the session's `logs` command);
/// stderr only shows warnings so the prompt stays readable. File logging
/// writes JSON through a non-blocking rolling appender.
fn init_tracing(
    logging: &LoggingConfig,
    buffer: &LogBuffer,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = format!("cascader={}", logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    let (file_layer, guard) = if logging.file_enabled {
        match std::fs::create_dir_all(&logging.file_dir) {
            Ok(()) => {
                let file_appender = match logging.file_rotation {
                    LogRotation::Hourly => {
                        tracing_appender::rolling::hourly(&logging.file_dir, &logging.file_prefix)
                    }
                    LogRotation::Daily => {
                        tracing_appender::rolling::daily(&logging.file_dir, &logging.file_prefix)
                    }
                    LogRotation::Never => {
                        tracing_appender::rolling::never(&logging.file_dir, &logging.file_prefix)
                    }
                };
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_ansi(false);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    logging.file_dir, e
                );
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(CaptureLayer::new(buffer.clone()))
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}
