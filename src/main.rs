use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vigil::cli::{self, Cli, Commands};
use vigil::config::{AppConfig, LoggingConfig};
use vigil::error::Result;
use vigil::pipeline::run_health_check;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;
    init_logging(&config.logging);

    match cli.command {
        Commands::Run { dry_run } => {
            cli::preflight(&config, dry_run)?;
            match run_health_check(&config, dry_run).await {
                Ok(outcome) => {
                    info!(
                        "Health check finished: {} ({})",
                        outcome.report.overall_status,
                        outcome.archive_path.display()
                    );
                }
                Err(e) => {
                    error!("Health check run failed: {}", e);
                    return Err(e);
                }
            }
        }
        Commands::Collect { dry_run } => {
            cli::print_snapshot(&config, dry_run).await?;
        }
        Commands::CheckConfig => {
            cli::check_config(&config)?;
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .init();
    }
}
