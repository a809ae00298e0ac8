//! Quick facts: a flat set of counters pulled from each source summary
//!
//! Sources whose collector failed contribute nothing. A missing key means
//! "unknown", never zero.

use std::collections::BTreeMap;

use crate::domain::{SourceId, SourceResult};

/// (summary key, fact name) pairs read from each source
fn counters(source: SourceId) -> &'static [(&'static str, &'static str)] {
    match source {
        SourceId::AzureMl => &[
            ("failed", "ml_jobs_failed"),
            ("running", "ml_jobs_running"),
            ("completed", "ml_jobs_completed"),
        ],
        SourceId::AzureMonitor => &[
            ("critical", "monitor_critical_alerts"),
            ("warnings", "monitor_warnings"),
        ],
        SourceId::Jira => &[
            ("open_high_priority", "jira_open_high_priority"),
            ("resolved_last_24h", "jira_resolved_24h"),
            ("created_last_7d", "jira_created_7d"),
        ],
        SourceId::Shell => &[
            ("critical", "shell_checks_critical"),
            ("warnings", "shell_checks_warnings"),
        ],
    }
}

/// Extract quick facts from a set of source results
pub fn extract_facts(sources: &BTreeMap<SourceId, SourceResult>) -> BTreeMap<String, u64> {
    let mut facts = BTreeMap::new();

    for (id, result) in sources {
        if result.is_error() {
            continue;
        }
        for (key, name) in counters(*id) {
            if let Some(count) = result.fact(key).and_then(|v| v.as_count()) {
                facts.insert((*name).to_string(), count);
            }
        }
    }

    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Status;

    fn ml_result(status: Status) -> SourceResult {
        SourceResult::new(SourceId::AzureMl, status)
            .with_fact("failed", 2usize)
            .with_fact("running", 5usize)
            .with_fact("completed", 18usize)
            .with_fact("total", 25usize)
    }

    #[test]
    fn test_extracts_fixed_counters_only() {
        let mut sources = BTreeMap::new();
        sources.insert(SourceId::AzureMl, ml_result(Status::Warning));

        let facts = extract_facts(&sources);

        assert_eq!(facts.len(), 3);
        assert_eq!(facts["ml_jobs_failed"], 2);
        assert_eq!(facts["ml_jobs_running"], 5);
        assert_eq!(facts["ml_jobs_completed"], 18);
    }

    #[test]
    fn test_error_source_contributes_nothing() {
        let mut failed = ml_result(Status::Error);
        failed.error = Some("token expired".into());
        let mut sources = BTreeMap::new();
        sources.insert(SourceId::AzureMl, failed);

        assert!(extract_facts(&sources).is_empty());
    }

    #[test]
    fn test_degraded_source_still_reports() {
        let mut sources = BTreeMap::new();
        sources.insert(SourceId::AzureMl, ml_result(Status::Critical));

        let facts = extract_facts(&sources);
        assert_eq!(facts.get("ml_jobs_failed"), Some(&2));
    }

    #[test]
    fn test_missing_or_non_numeric_counter_is_omitted() {
        let result = SourceResult::new(SourceId::Jira, Status::Healthy)
            .with_fact("open_high_priority", 1usize)
            .with_fact("resolved_last_24h", "n/a");
        let mut sources = BTreeMap::new();
        sources.insert(SourceId::Jira, result);

        let facts = extract_facts(&sources);
        assert_eq!(facts.get("jira_open_high_priority"), Some(&1));
        assert!(!facts.contains_key("jira_resolved_24h"));
        assert!(!facts.contains_key("jira_created_7d"));
    }
}
