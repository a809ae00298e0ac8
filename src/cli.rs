use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{Result, VigilError};
use crate::pipeline::collect_snapshot;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Platform health aggregation with narrative analysis", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration directory (default.toml and <VIGIL_ENV>.toml)
    #[arg(short, long, global = true, default_value = "config", env = "VIGIL_CONFIG_DIR")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect, analyse and deliver one health report
    Run {
        /// Use canned source data instead of the real sources
        #[arg(long)]
        dry_run: bool,
    },
    /// Collect all sources and print the snapshot as JSON
    Collect {
        /// Use canned source data instead of the real sources
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the configuration and report every problem
    CheckConfig,
}

/// Check the configuration before a run.
///
/// Problems abort a real run; a dry run only logs them.
pub fn preflight(config: &AppConfig, dry_run: bool) -> Result<()> {
    for id in config.unconfigured_sources() {
        warn!("{} is enabled but not configured; it will report an error", id);
    }

    match config.validate() {
        Ok(()) => Ok(()),
        Err(problems) if dry_run => {
            for problem in &problems {
                warn!("Config: {}", problem);
            }
            Ok(())
        }
        Err(problems) => Err(VigilError::InvalidConfig(problems.join("; "))),
    }
}

/// Print the validation result for `vigil check-config`
pub fn check_config(config: &AppConfig) -> Result<()> {
    let unconfigured = config.unconfigured_sources();
    let result = config.validate();

    println!("Enabled sources:");
    for id in &config.sources.enabled {
        let state = if unconfigured.contains(id) {
            "not configured"
        } else {
            "ok"
        };
        println!("  {:<14} {}", id.as_str(), state);
    }
    println!("Analysis backend: {:?} ({})", config.analysis.backend, config.analysis.model);
    println!("Report directory: {}", config.delivery.report_dir.display());

    match result {
        Ok(()) => {
            println!("Configuration OK");
            Ok(())
        }
        Err(problems) => {
            println!("Configuration problems:");
            for problem in &problems {
                println!("  - {}", problem);
            }
            Err(VigilError::InvalidConfig(format!(
                "{} problem(s) found",
                problems.len()
            )))
        }
    }
}

/// Collect once and print the full snapshot
pub async fn print_snapshot(config: &AppConfig, dry_run: bool) -> Result<()> {
    let snapshot = collect_snapshot(config, dry_run).await?;
    info!(
        "Collected {} sources, overall {}",
        snapshot.sources.len(),
        snapshot.overall_status
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
