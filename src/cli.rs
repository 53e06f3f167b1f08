// CLI module - command-line argument parsing and config handlers
//
// Subcommands:
// - run: Start the interactive selector session (default)
// - config --show: Display effective configuration
// - config --reset: Regenerate config file with defaults
// - config --path: Show config file path

use crate::config::{Config, SourceKind, VERSION};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// cascader - dependent selector chains over Azure Monitor metadata
#[derive(Parser)]
#[command(name = "cascader")]
#[command(version = VERSION)]
#[command(about = "Interactive cascading selector for Azure Monitor metrics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive selector session
    Run(RunArgs),

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Overrides for one session
#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Option source: fixture or azure
    #[arg(long, value_parser = parse_source)]
    pub source: Option<SourceKind>,

    /// Fixture file (implies --source fixture unless given)
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Saved metrics query (JSON) to mount the chain from
    #[arg(long)]
    pub query: Option<PathBuf>,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.fixture {
            config.source.fixture_path = Some(path.clone());
            config.source.kind = SourceKind::Fixture;
        }
        if let Some(kind) = self.source {
            config.source.kind = kind;
        }
    }
}

fn parse_source(s: &str) -> Result<SourceKind, String> {
    SourceKind::parse(s).ok_or_else(|| format!("unknown source {:?} (expected fixture or azure)", s))
}

/// Handle config commands. Returns the run arguments when a session should start.
pub fn handle_cli(cli: Cli) -> Result<Option<RunArgs>> {
    match cli.command {
        Some(Commands::Config { show, reset, path }) => {
            if path {
                handle_config_path()?;
            } else if show {
                handle_config_show()?;
            } else if reset {
                handle_config_reset()?;
            } else {
                // No flag provided, show help
                println!("Usage: cascader config [--show|--reset|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --path    Show config file path");
            }
            Ok(None)
        }
        Some(Commands::Run(args)) => Ok(Some(args)),
        None => Ok(Some(RunArgs::default())),
    }
}

fn config_path() -> Result<PathBuf> {
    Config::config_path().ok_or_else(|| anyhow!("Could not determine config path"))
}

fn handle_config_path() -> Result<()> {
    println!("{}", config_path()?.display());
    Ok(())
}

fn handle_config_show() -> Result<()> {
    let config = Config::from_env()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    println!();
    let path = config_path()?;
    if path.exists() {
        println!("# Source: {}", path.display());
    } else {
        println!("# Source: defaults (no config file)");
    }
    Ok(())
}

fn handle_config_reset() -> Result<()> {
    let path = config_path()?;

    // Confirm if file exists
    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Error creating {}", parent.display()))?;
    }
    std::fs::write(&path, Config::default().to_toml())
        .with_context(|| format!("Error writing {}", path.display()))?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "cascader", "run", "--source", "azure", "--query", "saved.json",
        ])
        .unwrap();
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.source, Some(SourceKind::Azure));
        assert_eq!(args.query, Some(PathBuf::from("saved.json")));
    }

    #[test]
    fn test_unknown_source_rejected() {
        assert!(Cli::try_parse_from(["cascader", "run", "--source", "gcp"]).is_err());
    }

    #[test]
    fn test_fixture_flag_selects_fixture_source() {
        let mut config = Config::default();
        config.source.kind = SourceKind::Azure;

        let args = RunArgs {
            fixture: Some(PathBuf::from("demos/azure_monitor.toml")),
            ..Default::default()
        };
        args.apply(&mut config);

        assert_eq!(config.source.kind, SourceKind::Fixture);
        assert!(config.source.fixture_path.is_some());
    }

    #[test]
    fn test_no_subcommand_runs_session() {
        let cli = Cli::try_parse_from(["cascader"]).unwrap();
        assert!(handle_cli(cli).unwrap().is_some());
    }
}
