use serde::{Deserialize, Serialize};
use std::fmt;

/// Health status reported by a source and derived for the whole platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Warning,
    Critical,
    /// The collector itself failed; no health verdict is available
    Error,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Healthy,
        Status::Warning,
        Status::Critical,
        Status::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Healthy => "healthy",
            Status::Warning => "warning",
            Status::Critical => "critical",
            Status::Error => "error",
        }
    }

    /// Severity rank used for merging. Critical and Error share the top rank.
    pub fn rank(&self) -> u8 {
        match self {
            Status::Healthy => 0,
            Status::Warning => 1,
            Status::Critical | Status::Error => 2,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Status::Healthy => "\u{2705}",            // check mark
            Status::Warning => "\u{26a0}\u{fe0f}",    // warning sign
            Status::Critical => "\u{1f534}",          // red circle
            Status::Error => "\u{274c}",              // red X
        }
    }

    // Within the top rank Critical wins, so the merged value does not
    // depend on input order.
    fn merge_key(&self) -> (u8, u8) {
        match self {
            Status::Critical => (self.rank(), 1),
            _ => (self.rank(), 0),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Merge any number of statuses into one overall verdict.
///
/// The result is the highest-ranked input; an empty input is `Healthy`.
/// `Critical` and `Error` have equal rank. When both are present the result is
/// `Critical`, which keeps the merge independent of input order.
pub fn merge<I>(statuses: I) -> Status
where
    I: IntoIterator<Item = Status>,
{
    statuses
        .into_iter()
        .max_by_key(Status::merge_key)
        .unwrap_or(Status::Healthy)
}

/// Status as it appears in a report's per-source table. `Unknown` only shows
/// up in fallback reports, for sources that have no entry in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Healthy,
    Warning,
    Critical,
    Error,
    Unknown,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Healthy => "healthy",
            SourceStatus::Warning => "warning",
            SourceStatus::Critical => "critical",
            SourceStatus::Error => "error",
            SourceStatus::Unknown => "unknown",
        }
    }
}

impl From<Status> for SourceStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Healthy => SourceStatus::Healthy,
            Status::Warning => SourceStatus::Warning,
            Status::Critical => SourceStatus::Critical,
            Status::Error => SourceStatus::Error,
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anomaly severity in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
