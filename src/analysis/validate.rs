//! Strict validation of the narrative service reply

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

use super::engine::AnalysisSettings;
use crate::domain::{Anomaly, RecommendedAction, Report, Severity, SourceId, SourceStatus, Status};
use crate::error::{Result, VigilError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireReport {
    overall_status: Status,
    headline: String,
    narrative: String,
    anomalies: Vec<WireAnomaly>,
    recommended_actions: Vec<WireAction>,
    #[serde(deserialize_with = "unique_source_statuses")]
    source_statuses: BTreeMap<SourceId, Status>,
    /// Accepted and ignored; the engine stamps its own time
    #[serde(default)]
    #[allow(dead_code)]
    generated_at: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireAnomaly {
    severity: Severity,
    source: String,
    title: String,
    detail: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireAction {
    priority: u32,
    action: String,
    rationale: String,
    owner: String,
}

/// Source status map with exact source names and no repeated keys
fn unique_source_statuses<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<SourceId, Status>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StatusesVisitor;

    impl<'de> Visitor<'de> for StatusesVisitor {
        type Value = BTreeMap<SourceId, Status>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of source id to status")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut statuses = BTreeMap::new();
            while let Some((id, status)) = map.next_entry::<SourceId, Status>()? {
                if statuses.insert(id, status).is_some() {
                    return Err(de::Error::custom(format!(
                        "duplicate source_statuses key '{}'",
                        id
                    )));
                }
            }
            Ok(statuses)
        }
    }

    deserializer.deserialize_map(StatusesVisitor)
}

fn invalid(message: impl Into<String>) -> VigilError {
    VigilError::InvalidReport(message.into())
}

fn check_actions(actions: &[WireAction], owners: &[String]) -> Result<()> {
    for (i, action) in actions.iter().enumerate() {
        if action.priority == 0 {
            return Err(invalid(format!(
                "recommended_actions[{}].priority must be a positive integer",
                i
            )));
        }
        if !owners.is_empty() && !owners.iter().any(|o| o == &action.owner) {
            return Err(invalid(format!(
                "recommended_actions[{}].owner '{}' is not one of: {}",
                i,
                action.owner,
                owners.join(", ")
            )));
        }
    }
    Ok(())
}

fn check_source_statuses(
    raw: BTreeMap<SourceId, Status>,
    known: &[SourceId],
) -> Result<BTreeMap<SourceId, SourceStatus>> {
    let statuses: BTreeMap<SourceId, SourceStatus> = raw
        .into_iter()
        .map(|(id, status)| (id, SourceStatus::from(status)))
        .collect();

    let missing: Vec<&str> = known
        .iter()
        .filter(|id| !statuses.contains_key(*id))
        .map(SourceId::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(invalid(format!(
            "source_statuses is missing: {}",
            missing.join(", ")
        )));
    }

    Ok(statuses)
}

/// Parse and validate a reply into a report.
///
/// Rejects unknown fields, invalid status or severity values, non-positive
/// priorities, owners outside `settings.owners` (when non-empty) and
/// `source_statuses` with inexact or repeated keys or that do not cover every
/// known source. `generated_at` is
/// always the supplied time.
pub fn parse_report(
    text: &str,
    settings: &AnalysisSettings,
    snapshot_collected_at: DateTime<Utc>,
    generated_at: DateTime<Utc>,
) -> Result<Report> {
    let wire: WireReport = serde_json::from_str(text)
        .map_err(|e| invalid(format!("response does not match the report schema: {}", e)))?;

    check_actions(&wire.recommended_actions, &settings.owners)?;
    let source_statuses = check_source_statuses(wire.source_statuses, &settings.known_sources)?;

    Ok(Report {
        overall_status: wire.overall_status,
        headline: wire.headline,
        narrative: wire.narrative,
        anomalies: wire
            .anomalies
            .into_iter()
            .map(|a| Anomaly {
                severity: a.severity,
                source: a.source,
                title: a.title,
                detail: a.detail,
            })
            .collect(),
        recommended_actions: wire
            .recommended_actions
            .into_iter()
            .map(|a| RecommendedAction {
                priority: a.priority,
                action: a.action,
                rationale: a.rationale,
                owner: a.owner,
            })
            .collect(),
        source_statuses,
        generated_at,
        snapshot_collected_at,
        error: None,
    })
}
