//! Size-bounded copy of a snapshot for the analysis call
//!
//! Success lists are cut to a short head; failure evidence is always kept in
//! full. The shaped copy is only ever used as request input.

use serde::Serialize;

use crate::domain::{Snapshot, SourceId};

/// Default number of items kept from a truncatable list
pub const DEFAULT_LIST_CAP: usize = 5;

/// Detail lists that only carry success evidence
const TRUNCATABLE: &[(SourceId, &str)] = &[
    (SourceId::AzureMl, "completed_jobs"),
    (SourceId::Jira, "resolved_last_24h"),
];

/// Which lists get truncated and how far
#[derive(Debug, Clone)]
pub struct ShapingPolicy {
    pub list_cap: usize,
}

impl Default for ShapingPolicy {
    fn default() -> Self {
        Self {
            list_cap: DEFAULT_LIST_CAP,
        }
    }
}

impl ShapingPolicy {
    pub fn with_cap(list_cap: usize) -> Self {
        Self { list_cap }
    }

    pub fn is_truncatable(source: SourceId, field: &str) -> bool {
        TRUNCATABLE.iter().any(|(s, f)| *s == source && *f == field)
    }
}

/// Record of a list that was shortened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Truncation {
    pub source: SourceId,
    pub field: String,
    pub original_len: usize,
    pub kept: usize,
}

/// Snapshot copy prepared for the narrative service
#[derive(Debug, Clone, Serialize)]
pub struct ShapedSnapshot {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub truncated: Vec<Truncation>,
}

/// Produce a shaped deep copy; `snapshot` is left untouched
pub fn shape(snapshot: &Snapshot, policy: &ShapingPolicy) -> ShapedSnapshot {
    let mut copy = snapshot.clone();
    let mut truncated = Vec::new();

    for (id, result) in copy.sources.iter_mut() {
        for (field, value) in result.details.iter_mut() {
            if !ShapingPolicy::is_truncatable(*id, field) {
                continue;
            }
            if let Some(items) = value.as_array_mut() {
                if items.len() > policy.list_cap {
                    truncated.push(Truncation {
                        source: *id,
                        field: field.clone(),
                        original_len: items.len(),
                        kept: policy.list_cap,
                    });
                    items.truncate(policy.list_cap);
                }
            }
        }
    }

    ShapedSnapshot {
        snapshot: copy,
        truncated,
    }
}
