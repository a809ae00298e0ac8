//! One full health-check run: collect, analyse, deliver

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::analysis::{build_service, AnalysisEngine, AnalysisSettings, NarrativeService};
use crate::collector::{build_collectors, fixture_collectors, Collector};
use crate::config::AppConfig;
use crate::delivery::deliver;
use crate::domain::{Report, Snapshot};
use crate::error::Result;
use crate::orchestrator::collect_all;

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    pub snapshot: Snapshot,
    pub archive_path: PathBuf,
}

/// Real collectors, or canned ones for a dry run
pub fn collectors_for(config: &AppConfig, dry_run: bool) -> Result<Vec<Arc<dyn Collector>>> {
    if dry_run {
        info!("DRY RUN: using fixture data");
        Ok(fixture_collectors(&config.sources.enabled))
    } else {
        build_collectors(config)
    }
}

/// Collect every enabled source into a snapshot
pub async fn collect_snapshot(config: &AppConfig, dry_run: bool) -> Result<Snapshot> {
    let collectors = collectors_for(config, dry_run)?;
    Ok(collect_all(&collectors, config.sources.collection_timeout()).await)
}

/// Run the health check with the narrative service chosen by configuration
pub async fn run_health_check(config: &AppConfig, dry_run: bool) -> Result<RunOutcome> {
    let service = build_service(&config.analysis)?;
    run_with_service(config, dry_run, service).await
}

/// Run the health check against a given narrative service
pub async fn run_with_service(
    config: &AppConfig,
    dry_run: bool,
    service: Arc<dyn NarrativeService>,
) -> Result<RunOutcome> {
    info!("============================================================");
    info!("Platform health check starting");
    info!("============================================================");

    let snapshot = collect_snapshot(config, dry_run).await?;

    let engine = AnalysisEngine::new(service, AnalysisSettings::from_config(config));
    let report = engine.analyse(&snapshot).await;

    let archive_path = deliver(&config.delivery, &report, &snapshot).await?;

    info!("============================================================");
    info!(
        "Run complete. Status: {}{}",
        report.overall_status.as_str().to_uppercase(),
        if report.is_fallback() { " (fallback report)" } else { "" }
    );
    info!("Report saved: {}", archive_path.display());
    info!("============================================================");

    Ok(RunOutcome {
        report,
        snapshot,
        archive_path,
    })
}
