use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::source::{SourceId, SourceResult};
use super::status::{self, Status};
use crate::facts::extract_facts;

/// Point-in-time aggregation of every configured source for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub collected_at: DateTime<Utc>,
    pub overall_status: Status,
    pub sources: BTreeMap<SourceId, SourceResult>,
    pub quick_facts: BTreeMap<String, u64>,
}

impl Snapshot {
    /// Build a snapshot from completed source results, deriving the overall
    /// status and quick facts.
    pub fn assemble(sources: BTreeMap<SourceId, SourceResult>) -> Self {
        let overall_status = status::merge(sources.values().map(|r| r.status));
        let quick_facts = extract_facts(&sources);

        Self {
            collected_at: Utc::now(),
            overall_status,
            sources,
            quick_facts,
        }
    }

    pub fn source(&self, id: SourceId) -> Option<&SourceResult> {
        self.sources.get(&id)
    }

    /// Sources whose collector failed
    pub fn failed_sources(&self) -> Vec<SourceId> {
        self.sources
            .values()
            .filter(|r| r.is_error())
            .map(|r| r.source)
            .collect()
    }
}
