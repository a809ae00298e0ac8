//! Canned source data for dry runs
//!
//! Reproduces a platform with a handful of warnings across every source so the
//! whole pipeline can run without credentials.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Collector;
use crate::domain::{SourceId, SourceResult, Status};
use crate::error::Result;

/// Returns a fixed result for one source
pub struct FixtureCollector {
    source: SourceId,
}

impl FixtureCollector {
    pub fn new(source: SourceId) -> Self {
        Self { source }
    }
}

fn completed_jobs() -> Value {
    let names = [
        "sales-forecast-daily",
        "feature-store-refresh",
        "customer-segmentation",
        "fraud-score-batch",
        "promo-uplift-eval",
        "inventory-features",
        "store-cluster-weekly",
        "price-elasticity-refresh",
    ];
    Value::Array(
        names
            .iter()
            .map(|n| json!({"name": n, "display_name": n, "status": "Completed", "type": "pipeline"}))
            .collect(),
    )
}

fn azure_ml() -> SourceResult {
    SourceResult::new(SourceId::AzureMl, Status::Warning)
        .with_fact("total", 25usize)
        .with_fact("completed", 18usize)
        .with_fact("failed", 2usize)
        .with_fact("running", 5usize)
        .with_fact("other", 0usize)
        .with_fact("lookback_hours", 24i64)
        .with_detail(
            "failed_jobs",
            json!([
                {"name": "demand-forecast-prod-run-20241201", "display_name": "Demand Forecast Prod",
                 "status": "Failed", "type": "pipeline", "error": {"message": "OOMKilled on compute cluster"}},
                {"name": "churn-model-retrain-weekly", "display_name": "Churn Model Weekly Retrain",
                 "status": "Failed", "type": "command", "error": {"message": "Data drift detected: input schema mismatch"}},
            ]),
        )
        .with_detail(
            "running_jobs",
            json!([
                {"name": "pricing-model-inference-batch", "display_name": "Pricing Inference Batch", "status": "Running"},
                {"name": "inventory-forecast-daily", "display_name": "Inventory Forecast Daily", "status": "Running"},
            ]),
        )
        .with_detail("completed_jobs", completed_jobs())
        .with_detail(
            "compute",
            json!([
                {"name": "cpu-cluster-prod", "type": "AmlCompute", "state": "Succeeded"},
                {"name": "gpu-cluster-train", "type": "AmlCompute", "state": "Succeeded"},
            ]),
        )
}

fn azure_monitor() -> SourceResult {
    SourceResult::new(SourceId::AzureMonitor, Status::Warning)
        .with_fact("total_alerts", 3usize)
        .with_fact("critical", 0usize)
        .with_fact("warnings", 3usize)
        .with_fact("lookback_hours", 24i64)
        .with_detail("critical_alerts", json!([]))
        .with_detail(
            "warning_alerts",
            json!([
                {"alertName": "High CPU on cpu-cluster-prod", "severity": "Sev2", "targetResource": "cpu-cluster-prod"},
                {"alertName": "Storage account latency elevated", "severity": "Sev3", "targetResource": "mlstorageprod"},
                {"alertName": "Endpoint response time > 2s", "severity": "Sev3", "targetResource": "pricing-endpoint"},
            ]),
        )
        .with_detail("resource_health", json!([]))
}

fn jira() -> SourceResult {
    SourceResult::new(SourceId::Jira, Status::Warning)
        .with_fact("open_high_priority", 4usize)
        .with_fact("resolved_last_24h", 7usize)
        .with_fact("created_last_7d", 11usize)
        .with_detail("by_priority", json!({"P2": 2, "High": 2}))
        .with_detail(
            "open_tickets",
            json!([
                {"key": "MLPLAT-412", "summary": "Demand forecast pipeline OOM failure in prod",
                 "priority": "P2", "status": "In Progress", "assignee": "Platform On-Call"},
                {"key": "MLPLAT-408", "summary": "Churn model retrain failing due to schema drift",
                 "priority": "P2", "status": "Open", "assignee": "Unassigned"},
                {"key": "MLPLAT-401", "summary": "Pricing endpoint p99 latency exceeding SLA",
                 "priority": "High", "status": "In Progress", "assignee": "Platform On-Call"},
                {"key": "MLPLAT-399", "summary": "Dashboard not loading for AU-East users",
                 "priority": "High", "status": "Open", "assignee": "Unassigned"},
            ]),
        )
        .with_detail(
            "resolved_last_24h",
            json!([
                {"key": "MLPLAT-405", "summary": "Compute quota increase approved and applied", "priority": "P2"},
                {"key": "MLPLAT-397", "summary": "Azure ML SDK version pinned across all pipelines", "priority": "High"},
                {"key": "MLPLAT-396", "summary": "Stale feature store partitions cleaned up", "priority": "High"},
                {"key": "MLPLAT-394", "summary": "Endpoint autoscale rule corrected", "priority": "P2"},
                {"key": "MLPLAT-393", "summary": "Training cluster idle timeout reduced", "priority": "High"},
                {"key": "MLPLAT-390", "summary": "Service principal secret rotated", "priority": "P2"},
                {"key": "MLPLAT-388", "summary": "Monitoring workbook updated", "priority": "High"},
            ]),
        )
}

fn shell() -> SourceResult {
    SourceResult::new(SourceId::Shell, Status::Warning)
        .with_fact("total_checks", 2usize)
        .with_fact("healthy", 1usize)
        .with_fact("warnings", 1usize)
        .with_fact("critical", 0usize)
        .with_fact("errors", 0usize)
        .with_detail(
            "checks",
            json!([
                {"name": "disk_usage_check", "status": "warning", "exit_code": 1,
                 "output": "High disk usage detected: /mnt/mldata: 87%"},
                {"name": "process_check", "status": "healthy", "exit_code": 0,
                 "output": "12 'python' process(es) running"},
            ]),
        )
}

/// Canned result for `source`
pub fn fixture_result(source: SourceId) -> SourceResult {
    match source {
        SourceId::AzureMl => azure_ml(),
        SourceId::AzureMonitor => azure_monitor(),
        SourceId::Jira => jira(),
        SourceId::Shell => shell(),
    }
}

#[async_trait]
impl Collector for FixtureCollector {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn fetch(&self) -> Result<SourceResult> {
        Ok(fixture_result(self.source))
    }
}
