//! Narrative analysis of a snapshot
//!
//! The engine builds the request from a snapshot, calls a
//! [`NarrativeService`], strips incidental formatting from the reply and
//! validates it into a [`Report`](crate::domain::Report). Any failure along
//! the way produces the deterministic fallback report instead.

pub mod api;
pub mod cli;
pub mod engine;
pub mod extract;
pub mod prompt;
pub mod validate;

pub use api::ClaudeApiService;
pub use cli::ClaudeCliService;
pub use engine::{fallback_report, AnalysisEngine, AnalysisSettings};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::{AnalysisBackend, AnalysisConfig};
use crate::error::Result;

/// One call to the narrative service
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Fixed instructions, including the exact response schema
    pub preamble: String,
    /// Short numeric orientation derived from the quick facts
    pub facts_header: String,
    /// Shaped snapshot serialized as JSON
    pub body: String,
    /// Output bound for the generated text
    pub max_tokens: u32,
}

impl AnalysisRequest {
    /// User-turn text: facts header followed by the full data
    pub fn user_prompt(&self) -> String {
        format!("{}\n\n{}", self.facts_header, self.body)
    }
}

/// External text-generation service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NarrativeService: Send + Sync {
    /// Send the request and return the raw reply text
    async fn complete(&self, request: &AnalysisRequest) -> Result<String>;
}

/// Create the narrative service selected by `analysis.backend`
pub fn build_service(config: &AnalysisConfig) -> Result<Arc<dyn NarrativeService>> {
    let service: Arc<dyn NarrativeService> = match config.backend {
        AnalysisBackend::Api => Arc::new(ClaudeApiService::new(config)?),
        AnalysisBackend::Cli => Arc::new(ClaudeCliService::new(config)),
    };
    info!("Narrative service: {:?} ({})", config.backend, config.model);
    Ok(service)
}
