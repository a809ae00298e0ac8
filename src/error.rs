use thiserror::Error;

use crate::domain::SourceId;

/// Main error type for the health agent
#[derive(Error, Debug)]
pub enum VigilError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Source not configured: {0}")]
    NotConfigured(SourceId),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream API error: {status} - {body}")]
    Upstream { status: u16, body: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Collection errors
    #[error("Collector failure: {source_id} - {reason}")]
    Collector { source_id: SourceId, reason: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    // Analysis errors
    #[error("Analysis service error: {0}")]
    AnalysisService(String),

    #[error("Invalid report: {0}")]
    InvalidReport(String),

    // Delivery errors
    #[error("Delivery failed: {0}")]
    Delivery(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for VigilError
pub type Result<T> = std::result::Result<T, VigilError>;

impl VigilError {
    pub fn collector(source_id: SourceId, reason: impl Into<String>) -> Self {
        VigilError::Collector {
            source_id,
            reason: reason.into(),
        }
    }
}
