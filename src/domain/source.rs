use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::status::Status;

/// Monitored source identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Azure ML job runs and compute targets
    AzureMl,
    /// Azure Monitor alerts and resource health events
    AzureMonitor,
    /// Jira platform tickets
    Jira,
    /// Local shell health-check scripts
    Shell,
}

impl SourceId {
    pub const ALL: [SourceId; 4] = [
        SourceId::AzureMl,
        SourceId::AzureMonitor,
        SourceId::Jira,
        SourceId::Shell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::AzureMl => "azure_ml",
            SourceId::AzureMonitor => "azure_monitor",
            SourceId::Jira => "jira",
            SourceId::Shell => "shell",
        }
    }

    /// Human-readable label for messages
    pub fn label(&self) -> &'static str {
        match self {
            SourceId::AzureMl => "Azure ML",
            SourceId::AzureMonitor => "Azure Monitor",
            SourceId::Jira => "Jira",
            SourceId::Shell => "Shell Checks",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "azure_ml" => Ok(SourceId::AzureMl),
            "azure_monitor" => Ok(SourceId::AzureMonitor),
            "jira" => Ok(SourceId::Jira),
            "shell" => Ok(SourceId::Shell),
            other => Err(format!("unknown source id: {}", other)),
        }
    }
}

/// A single named fact in a source summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FactValue {
    /// Non-negative integer counters only
    pub fn as_count(&self) -> Option<u64> {
        match self {
            FactValue::Integer(n) if *n >= 0 => Some(*n as u64),
            _ => None,
        }
    }
}

impl From<usize> for FactValue {
    fn from(n: usize) -> Self {
        FactValue::Integer(n as i64)
    }
}

impl From<i64> for FactValue {
    fn from(n: i64) -> Self {
        FactValue::Integer(n)
    }
}

impl From<&str> for FactValue {
    fn from(s: &str) -> Self {
        FactValue::Text(s.to_string())
    }
}

/// Result of one collector run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: SourceId,
    pub status: Status,
    #[serde(default)]
    pub summary: BTreeMap<String, FactValue>,
    pub collected_at: DateTime<Utc>,
    /// Source-specific nested data (jobs, alerts, tickets, checks)
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
    /// Only set when `status` is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceResult {
    pub fn new(source: SourceId, status: Status) -> Self {
        Self {
            source,
            status,
            summary: BTreeMap::new(),
            collected_at: Utc::now(),
            details: BTreeMap::new(),
            error: None,
        }
    }

    /// Result for a collector that could not produce data
    pub fn failed(source: SourceId, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(source, Status::Error)
        }
    }

    pub fn with_fact(mut self, name: &str, value: impl Into<FactValue>) -> Self {
        self.summary.insert(name.to_string(), value.into());
        self
    }

    pub fn with_detail(mut self, name: &str, value: serde_json::Value) -> Self {
        self.details.insert(name.to_string(), value);
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    pub fn fact(&self, name: &str) -> Option<&FactValue> {
        self.summary.get(name)
    }
}
