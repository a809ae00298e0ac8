//! Azure Monitor alerts and resource health events from Log Analytics

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::azure::{fetch_token, LOG_ANALYTICS_SCOPE};
use super::{ensure_success, Collector};
use crate::config::{AzureCredentials, AzureMonitorConfig};
use crate::domain::{SourceId, SourceResult, Status};
use crate::error::{Result, VigilError};

const ALERTS_QUERY: &str = r#"AlertsManagementResources
| where type == 'microsoft.alertsmanagement/alerts'
| project
    alertName = properties.essentials.alertRule,
    severity  = properties.essentials.severity,
    state     = properties.essentials.alertState,
    monitorCondition = properties.essentials.monitorCondition,
    targetResource   = properties.essentials.targetResourceName,
    firedAt   = properties.essentials.startDateTime
| order by firedAt desc
| limit 50"#;

const RESOURCE_HEALTH_QUERY: &str = r#"AzureActivity
| where Level in ("Critical", "Error", "Warning")
| summarize EventCount=count() by ResourceGroup, ResourceId, OperationName, Level
| order by EventCount desc
| limit 20"#;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    tables: Vec<Table>,
}

#[derive(Debug, Deserialize)]
struct Table {
    #[serde(default)]
    columns: Vec<Column>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Column {
    name: String,
}

impl Table {
    /// Rows as column-name keyed objects
    fn records(self) -> Vec<Value> {
        let names: Vec<String> = self.columns.into_iter().map(|c| c.name).collect();
        self.rows
            .into_iter()
            .map(|row| {
                let record: Map<String, Value> = names.iter().cloned().zip(row).collect();
                Value::Object(record)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertClass {
    Critical,
    Warning,
    Other,
}

pub fn classify_severity(severity: &str) -> AlertClass {
    match severity {
        "Sev0" | "Sev1" | "Critical" => AlertClass::Critical,
        "Sev2" | "Sev3" | "Warning" => AlertClass::Warning,
        _ => AlertClass::Other,
    }
}

fn severity_of(alert: &Value) -> AlertClass {
    alert
        .get("severity")
        .and_then(Value::as_str)
        .map(classify_severity)
        .unwrap_or(AlertClass::Other)
}

fn build_result(alerts: Vec<Value>, resource_health: Vec<Value>, lookback_hours: u64) -> SourceResult {
    let total = alerts.len();
    let (critical, rest): (Vec<Value>, Vec<Value>) = alerts
        .into_iter()
        .partition(|a| severity_of(a) == AlertClass::Critical);
    let warnings: Vec<Value> = rest
        .into_iter()
        .filter(|a| severity_of(a) == AlertClass::Warning)
        .collect();

    let status = if !critical.is_empty() {
        Status::Critical
    } else if !warnings.is_empty() {
        Status::Warning
    } else {
        Status::Healthy
    };

    SourceResult::new(SourceId::AzureMonitor, status)
        .with_fact("total_alerts", total)
        .with_fact("critical", critical.len())
        .with_fact("warnings", warnings.len())
        .with_fact("lookback_hours", lookback_hours as i64)
        .with_detail("critical_alerts", json!(critical))
        .with_detail("warning_alerts", json!(warnings))
        .with_detail("resource_health", json!(resource_health))
}

/// Collects fired alerts and activity-log health events
pub struct AzureMonitorCollector {
    credentials: Option<AzureCredentials>,
    monitor: Option<AzureMonitorConfig>,
    lookback_hours: u64,
    http: Client,
}

impl AzureMonitorCollector {
    pub fn new(
        credentials: Option<AzureCredentials>,
        monitor: Option<AzureMonitorConfig>,
        lookback_hours: u64,
        http: Client,
    ) -> Self {
        Self {
            credentials,
            monitor,
            lookback_hours,
            http,
        }
    }

    async fn query(&self, monitor: &AzureMonitorConfig, token: &str, query: &str) -> Result<Vec<Value>> {
        let url = format!(
            "{}/v1/workspaces/{}/query",
            monitor.log_analytics_url.trim_end_matches('/'),
            monitor.workspace_id
        );
        let body = json!({
            "query": query,
            "timespan": format!("PT{}H", self.lookback_hours),
        });

        let response = self.http.post(&url).bearer_auth(token).json(&body).send().await?;
        let parsed: QueryResponse = ensure_success(response).await?.json().await?;

        Ok(parsed
            .tables
            .into_iter()
            .next()
            .map(Table::records)
            .unwrap_or_default())
    }

    /// A failing individual query is logged and treated as empty
    async fn query_or_empty(&self, monitor: &AzureMonitorConfig, token: &str, name: &str, query: &str) -> Vec<Value> {
        match self.query(monitor, token, query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("{} query failed: {}", name, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Collector for AzureMonitorCollector {
    fn source(&self) -> SourceId {
        SourceId::AzureMonitor
    }

    async fn fetch(&self) -> Result<SourceResult> {
        let (creds, monitor) = match (&self.credentials, &self.monitor) {
            (Some(c), Some(m)) => (c, m),
            _ => return Err(VigilError::NotConfigured(SourceId::AzureMonitor)),
        };

        info!("Collecting Azure Monitor data...");
        let token = fetch_token(&self.http, creds, LOG_ANALYTICS_SCOPE).await?;

        let (alerts, health) = tokio::join!(
            self.query_or_empty(monitor, &token, "Alert", ALERTS_QUERY),
            self.query_or_empty(monitor, &token, "Resource health", RESOURCE_HEALTH_QUERY),
        );

        let result = build_result(alerts, health, self.lookback_hours);
        info!("Azure Monitor: {:?} ({:?})", result.status, result.summary);
        Ok(result)
    }
}
