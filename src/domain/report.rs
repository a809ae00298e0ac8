use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::source::SourceId;
use super::status::{Severity, SourceStatus, Status};

/// Something the analysis flagged as wrong or noteworthy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub severity: Severity,
    /// Source the anomaly was observed in, as named by the analysis
    pub source: String,
    pub title: String,
    pub detail: String,
}

/// A prioritised follow-up action. Lower priority numbers come first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub priority: u32,
    pub action: String,
    pub rationale: String,
    pub owner: String,
}

/// Structured health report, either validated from the narrative service or
/// produced by the deterministic fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub overall_status: Status,
    pub headline: String,
    pub narrative: String,
    pub anomalies: Vec<Anomaly>,
    pub recommended_actions: Vec<RecommendedAction>,
    pub source_statuses: BTreeMap<SourceId, SourceStatus>,
    /// Stamped by the analysis engine, never taken from the service response
    pub generated_at: DateTime<Utc>,
    /// `collected_at` of the snapshot this report was derived from
    pub snapshot_collected_at: DateTime<Utc>,
    /// Only set on the fallback path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Report {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    /// Highest-priority action, if any
    pub fn top_action(&self) -> Option<&RecommendedAction> {
        self.recommended_actions.first()
    }

    /// Paragraphs of the narrative, split on blank lines
    pub fn narrative_paragraphs(&self) -> Vec<&str> {
        let paragraphs: Vec<&str> = self
            .narrative
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if paragraphs.is_empty() {
            vec![self.narrative.as_str()]
        } else {
            paragraphs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        Report {
            overall_status: Status::Warning,
            headline: "Two pipelines failing".into(),
            narrative: "First paragraph.\n\n  \n\nSecond paragraph.".into(),
            anomalies: vec![],
            recommended_actions: vec![RecommendedAction {
                priority: 1,
                action: "Restart the forecast pipeline".into(),
                rationale: "It feeds the replenishment job".into(),
                owner: "Platform Engineer".into(),
            }],
            source_statuses: BTreeMap::new(),
            generated_at: Utc::now(),
            snapshot_collected_at: Utc::now(),
            error: None,
        }
    }

    #[test]
    fn test_narrative_paragraphs() {
        let report = sample();
        assert_eq!(
            report.narrative_paragraphs(),
            vec!["First paragraph.", "Second paragraph."]
        );
    }

    #[test]
    fn test_report_serializes_without_error_field() {
        let report = sample();
        assert!(!report.is_fallback());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["overall_status"], "warning");
        assert_eq!(report.top_action().map(|a| a.priority), Some(1));
    }
}
