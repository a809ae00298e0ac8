//! Microsoft Teams incoming-webhook notifications
//!
//! Posts a plain-text summary of the report to a channel.

use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};

use crate::domain::{Report, Snapshot};
use crate::error::{Result, VigilError};

const TOP_ACTIONS: usize = 3;

#[derive(Serialize)]
struct TeamsMessage<'a> {
    text: &'a str,
}

/// Teams webhook client
#[derive(Clone)]
pub struct TeamsNotifier {
    client: Client,
    webhook_url: String,
}

impl TeamsNotifier {
    pub fn new(webhook_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| VigilError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, webhook_url })
    }

    /// Send a text message to the channel
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&TeamsMessage { text })
            .send()
            .await
            .map_err(|e| VigilError::Delivery(format!("Teams request failed: {}", e)))?;

        if response.status().is_success() {
            debug!("Teams notification sent successfully");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Teams notification failed: {} - {}", status, body);
            Err(VigilError::Delivery(format!("Teams webhook returned {}: {}", status, body)))
        }
    }

    /// Send the run summary
    pub async fn notify_report(&self, report: &Report, snapshot: &Snapshot, archive: Option<&Path>) -> Result<()> {
        self.send_message(&summary_text(report, snapshot, archive)).await
    }
}

/// Plain-text summary: status, headline, key facts, top actions and
/// per-source status
pub fn summary_text(report: &Report, snapshot: &Snapshot, archive: Option<&Path>) -> String {
    let fact = |name: &str| {
        snapshot
            .quick_facts
            .get(name)
            .map(u64::to_string)
            .unwrap_or_else(|| "-".to_string())
    };

    let mut lines = vec![
        format!(
            "{} ML Platform Health: {}",
            report.overall_status.emoji(),
            report.overall_status.as_str().to_uppercase()
        ),
        report.headline.clone(),
        String::new(),
        format!(
            "ML jobs failed: {} | Critical alerts: {} | Open P1/P2 tickets: {} | Shell check failures: {}",
            fact("ml_jobs_failed"),
            fact("monitor_critical_alerts"),
            fact("jira_open_high_priority"),
            fact("shell_checks_critical"),
        ),
    ];

    if let Some(anomaly) = report.anomalies.first() {
        lines.push(format!("Top anomaly: [{}] {}", anomaly.severity, anomaly.title));
    }

    if !report.recommended_actions.is_empty() {
        lines.push(String::new());
        lines.push("Recommended actions:".to_string());
        for action in report.recommended_actions.iter().take(TOP_ACTIONS) {
            lines.push(format!("{}. {} ({})", action.priority, action.action, action.owner));
        }
    }

    lines.push(String::new());
    lines.push(
        report
            .source_statuses
            .iter()
            .map(|(id, status)| format!("{}: {}", id.label(), status.as_str().to_uppercase()))
            .collect::<Vec<_>>()
            .join(" | "),
    );

    if let Some(path) = archive {
        lines.push(format!("Full report: {}", path.display()));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fallback_report;
    use crate::domain::{SourceId, SourceResult, Status};
    use std::collections::BTreeMap;

    #[test]
    fn test_summary_text_for_fallback() {
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceId::AzureMl,
            SourceResult::new(SourceId::AzureMl, Status::Warning)
                .with_fact("failed", 2usize)
                .with_fact("running", 1usize)
                .with_fact("completed", 9usize),
        );
        let snapshot = Snapshot::assemble(sources);
        let report = fallback_report(&snapshot, &[SourceId::AzureMl, SourceId::Jira], "timeout");

        let text = summary_text(&report, &snapshot, Some(Path::new("/tmp/r.json")));
        assert!(text.contains("ML Platform Health: WARNING"));
        assert!(text.contains("ML jobs failed: 2 | Critical alerts: -"));
        assert!(text.contains("1. Review the raw collected data"));
        assert!(text.contains("Azure ML: WARNING | Jira: UNKNOWN"));
        assert!(text.ends_with("Full report: /tmp/r.json"));
        assert!(!text.contains("Top anomaly"));
    }
}
