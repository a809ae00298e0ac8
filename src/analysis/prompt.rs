//! Request construction: instruction preamble, facts header, shaped body

use std::collections::BTreeMap;

use super::engine::AnalysisSettings;
use super::AnalysisRequest;
use crate::domain::{Snapshot, SourceId, Status};
use crate::error::Result;
use crate::shaper::shape;

const PREAMBLE_HEAD: &str = r#"You are an ML platform health analyst with deep knowledge of MLOps, Azure ML, Azure Monitor and platform reliability engineering.

Your job is to analyse the platform health snapshot and produce a clear, actionable report.

Respond ONLY with a single valid JSON object. No preamble, no Markdown, no explanation outside the JSON.

The JSON must follow this exact schema and contain no other fields:"#;

const PREAMBLE_RULES: &str = r#"Rules:
- Be specific: use actual job names, ticket keys and alert names from the data
- Prioritise actions by business impact, not just severity; priority 1 comes first
- Keep the narrative readable by both engineers and managers
- If a source returned an error, note it but do not let it block the report
- Never invent data: only reference what is in the snapshot
- If a list was truncated (see "truncated"), say so instead of guessing at the missing items"#;

fn alternatives<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("|")
}

/// Fixed instructions with the response schema for the given sources and
/// owners
pub fn instruction_preamble(known_sources: &[SourceId], owners: &[String]) -> String {
    let statuses = alternatives(Status::ALL.iter().map(Status::as_str));
    let sources = alternatives(known_sources.iter().map(SourceId::as_str));
    let owner = if owners.is_empty() {
        "Team or role responsible".to_string()
    } else {
        alternatives(owners)
    };
    let source_statuses = known_sources
        .iter()
        .map(|id| format!("    \"{}\": \"{}\"", id, statuses))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        r#"{head}
{{
  "overall_status": "{statuses}",
  "headline": "One sentence platform status summary",
  "narrative": "2-4 paragraph plain English summary of what is happening across the platform",
  "anomalies": [
    {{
      "severity": "critical|warning|info",
      "source": "{sources}",
      "title": "Short anomaly title",
      "detail": "What is wrong and why it matters"
    }}
  ],
  "recommended_actions": [
    {{
      "priority": 1,
      "action": "What to do",
      "rationale": "Why this should be done first",
      "owner": "{owner}"
    }}
  ],
  "source_statuses": {{
{source_statuses}
  }}
}}

{rules}"#,
        head = PREAMBLE_HEAD,
        statuses = statuses,
        sources = sources,
        owner = owner,
        source_statuses = source_statuses,
        rules = PREAMBLE_RULES,
    )
}

fn fact(facts: &BTreeMap<String, u64>, name: &str) -> String {
    facts
        .get(name)
        .map(u64::to_string)
        .unwrap_or_else(|| "?".to_string())
}

/// Short numeric orientation for the service; unknown facts show as `?`
pub fn facts_header(snapshot: &Snapshot) -> String {
    let f = &snapshot.quick_facts;
    let mut header = format!(
        "PLATFORM HEALTH SNAPSHOT\n\
         Collected: {}\n\
         Overall Status: {}\n\
         \n\
         QUICK FACTS:\n\
         - Azure ML: {} failed jobs, {} running, {} completed\n\
         - Azure Monitor: {} critical alerts, {} warnings\n\
         - Jira: {} open high-priority tickets, {} resolved last 24h, {} created last 7d\n\
         - Shell Checks: {} critical, {} warnings\n",
        snapshot.collected_at.to_rfc3339(),
        snapshot.overall_status.as_str().to_uppercase(),
        fact(f, "ml_jobs_failed"),
        fact(f, "ml_jobs_running"),
        fact(f, "ml_jobs_completed"),
        fact(f, "monitor_critical_alerts"),
        fact(f, "monitor_warnings"),
        fact(f, "jira_open_high_priority"),
        fact(f, "jira_resolved_24h"),
        fact(f, "jira_created_7d"),
        fact(f, "shell_checks_critical"),
        fact(f, "shell_checks_warnings"),
    );

    let failed = snapshot.failed_sources();
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(SourceId::as_str).collect();
        header.push_str(&format!("- Unavailable sources: {}\n", names.join(", ")));
    }

    header.push_str("\nFULL DATA:");
    header
}

/// Assemble the full request for `snapshot`
pub fn build_request(snapshot: &Snapshot, settings: &AnalysisSettings) -> Result<AnalysisRequest> {
    let shaped = shape(snapshot, &settings.shaping);
    let body = serde_json::to_string_pretty(&shaped)?;

    Ok(AnalysisRequest {
        preamble: instruction_preamble(&settings.known_sources, &settings.owners),
        facts_header: facts_header(snapshot),
        body,
        max_tokens: settings.max_tokens,
    })
}
