//! Analysis engine: request, reply extraction, validation and fallback

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::extract::strip_fences;
use super::prompt::build_request;
use super::validate::parse_report;
use super::NarrativeService;
use crate::config::AppConfig;
use crate::domain::{RecommendedAction, Report, Snapshot, SourceId, SourceStatus};
use crate::error::Result;
use crate::shaper::ShapingPolicy;

pub const FALLBACK_HEADLINE: &str =
    "Automated health analysis failed: manual review of raw data required";
pub const FALLBACK_OWNER: &str = "Platform Engineer";

/// What the engine needs to know to build requests and validate replies
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Sources every report must carry a status for
    pub known_sources: Vec<SourceId>,
    /// Accepted action owners; empty accepts any owner
    pub owners: Vec<String>,
    pub max_tokens: u32,
    pub shaping: ShapingPolicy,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AnalysisSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            known_sources: config.sources.enabled.clone(),
            owners: config.analysis.owners.clone(),
            max_tokens: config.analysis.max_tokens,
            shaping: ShapingPolicy::with_cap(config.analysis.success_list_cap),
        }
    }
}

/// Minimal report used whenever the narrative service cannot produce a valid
/// one. `cause` is carried verbatim in `error`.
pub fn fallback_report(snapshot: &Snapshot, known_sources: &[SourceId], cause: &str) -> Report {
    let source_statuses: BTreeMap<SourceId, SourceStatus> = known_sources
        .iter()
        .map(|id| {
            let status = snapshot
                .source(*id)
                .map(|r| SourceStatus::from(r.status))
                .unwrap_or(SourceStatus::Unknown);
            (*id, status)
        })
        .collect();

    Report {
        overall_status: snapshot.overall_status,
        headline: FALLBACK_HEADLINE.to_string(),
        narrative: format!(
            "The automated analysis could not produce a report: {}. \
             The raw data was collected and is stored with the archived snapshot for manual review.",
            cause
        ),
        anomalies: Vec::new(),
        recommended_actions: vec![RecommendedAction {
            priority: 1,
            action: "Review the raw collected data in the archived health report".to_string(),
            rationale: "Automated analysis failed; the raw source data is still available".to_string(),
            owner: FALLBACK_OWNER.to_string(),
        }],
        source_statuses,
        generated_at: Utc::now(),
        snapshot_collected_at: snapshot.collected_at,
        error: Some(cause.to_string()),
    }
}

/// Turns a snapshot into a report through a narrative service
pub struct AnalysisEngine {
    service: Arc<dyn NarrativeService>,
    settings: AnalysisSettings,
}

impl AnalysisEngine {
    pub fn new(service: Arc<dyn NarrativeService>, settings: AnalysisSettings) -> Self {
        Self { service, settings }
    }

    /// Analyse `snapshot`. Never fails: any error yields the fallback report.
    pub async fn analyse(&self, snapshot: &Snapshot) -> Report {
        info!("Sending snapshot for analysis...");
        match self.try_analyse(snapshot).await {
            Ok(report) => {
                info!(
                    "Analysis complete. Status: {}",
                    report.overall_status.as_str().to_uppercase()
                );
                report
            }
            Err(e) => {
                error!("Analysis failed, using fallback report: {}", e);
                fallback_report(snapshot, &self.settings.known_sources, &e.to_string())
            }
        }
    }

    async fn try_analyse(&self, snapshot: &Snapshot) -> Result<Report> {
        let request = build_request(snapshot, &self.settings)?;
        debug!("Analysis request body: {} bytes", request.body.len());

        let raw = self.service.complete(&request).await?;
        debug!("Raw analysis reply: {} chars", raw.len());

        parse_report(
            strip_fences(&raw),
            &self.settings,
            snapshot.collected_at,
            Utc::now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisRequest, MockNarrativeService};
    use crate::domain::{SourceResult, Status};
    use crate::error::VigilError;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        let mut sources = BTreeMap::new();
        for id in [SourceId::AzureMl, SourceId::AzureMonitor, SourceId::Jira] {
            sources.insert(id, SourceResult::new(id, Status::Healthy));
        }
        sources.insert(
            SourceId::Shell,
            SourceResult::new(SourceId::Shell, Status::Critical)
                .with_fact("critical", 1usize)
                .with_fact("warnings", 0usize),
        );
        Snapshot::assemble(sources)
    }

    fn reply() -> serde_json::Value {
        json!({
            "overall_status": "critical",
            "headline": "Disk full on training host",
            "narrative": "The /mnt/mldata mount is at 97%.",
            "anomalies": [
                {"severity": "critical", "source": "shell", "title": "Disk full", "detail": "/mnt/mldata 97%"}
            ],
            "recommended_actions": [
                {"priority": 1, "action": "Free disk space", "rationale": "Jobs will fail", "owner": "Platform Engineer"},
                {"priority": 2, "action": "Add disk alert", "rationale": "Catch earlier", "owner": "Management"}
            ],
            "source_statuses": {
                "azure_ml": "healthy", "azure_monitor": "healthy", "jira": "healthy", "shell": "critical"
            }
        })
    }

    fn engine_replying(text: String) -> AnalysisEngine {
        let mut service = MockNarrativeService::new();
        service
            .expect_complete()
            .times(1)
            .returning(move |_| Ok(text.clone()));
        AnalysisEngine::new(Arc::new(service), AnalysisSettings::default())
    }

    #[tokio::test]
    async fn test_valid_reply_is_returned_as_parsed() {
        let snapshot = snapshot();
        let engine = engine_replying(reply().to_string());
        let report = engine.analyse(&snapshot).await;

        assert!(!report.is_fallback());
        assert_eq!(report.overall_status, Status::Critical);
        assert_eq!(report.headline, "Disk full on training host");
        assert_eq!(report.recommended_actions.len(), 2);
        assert_eq!(report.snapshot_collected_at, snapshot.collected_at);
        assert!(report.generated_at >= snapshot.collected_at);
    }

    #[tokio::test]
    async fn test_fenced_reply_is_accepted() {
        let engine = engine_replying(format!("```json\n{}\n```", reply()));
        let report = engine.analyse(&snapshot()).await;
        assert!(!report.is_fallback());
    }

    #[tokio::test]
    async fn test_request_carries_facts_and_token_bound() {
        let mut service = MockNarrativeService::new();
        service
            .expect_complete()
            .withf(|req: &AnalysisRequest| {
                req.max_tokens == 4096
                    && req.facts_header.contains("Shell Checks: 1 critical, 0 warnings")
                    && req.preamble.contains("source_statuses")
            })
            .times(1)
            .returning(|_| Ok(reply().to_string()));

        let engine = AnalysisEngine::new(Arc::new(service), AnalysisSettings::default());
        assert!(!engine.analyse(&snapshot()).await.is_fallback());
    }

    #[tokio::test]
    async fn test_service_failure_yields_fallback() {
        let mut service = MockNarrativeService::new();
        service
            .expect_complete()
            .times(1)
            .returning(|_| Err(VigilError::AnalysisService("503 overloaded".into())));

        let snapshot = snapshot();
        let engine = AnalysisEngine::new(Arc::new(service), AnalysisSettings::default());
        let report = engine.analyse(&snapshot).await;

        assert!(report.is_fallback());
        assert_eq!(report.overall_status, snapshot.overall_status);
        assert_eq!(report.headline, FALLBACK_HEADLINE);
        assert!(report.anomalies.is_empty());
        assert_eq!(report.recommended_actions.len(), 1);
        assert_eq!(report.recommended_actions[0].priority, 1);
        assert!(report.error.as_deref().unwrap().contains("503 overloaded"));
        assert_eq!(report.source_statuses[&SourceId::Shell], SourceStatus::Critical);
    }

    #[tokio::test]
    async fn test_missing_anomalies_yields_fallback() {
        let mut value = reply();
        value.as_object_mut().unwrap().remove("anomalies");
        let report = engine_replying(value.to_string()).analyse(&snapshot()).await;

        assert!(report.is_fallback());
        assert!(report.error.as_deref().unwrap().contains("anomalies"));
    }

    #[tokio::test]
    async fn test_prose_reply_yields_fallback() {
        let report = engine_replying("I'm sorry, I can't do that.".to_string())
            .analyse(&snapshot())
            .await;
        assert!(report.is_fallback());
    }

    #[test]
    fn test_fallback_marks_absent_sources_unknown() {
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceId::Jira,
            SourceResult::failed(SourceId::Jira, "401 Unauthorized"),
        );
        let snapshot = Snapshot::assemble(sources);
        let report = fallback_report(&snapshot, &SourceId::ALL, "timeout");

        assert_eq!(report.overall_status, Status::Error);
        assert_eq!(report.source_statuses[&SourceId::Jira], SourceStatus::Error);
        assert_eq!(report.source_statuses[&SourceId::AzureMl], SourceStatus::Unknown);
        assert_eq!(report.error.as_deref(), Some("timeout"));
        assert_eq!(report.recommended_actions[0].owner, FALLBACK_OWNER);
    }
}
