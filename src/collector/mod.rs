//! Source collectors
//!
//! Each collector fetches one monitored source and condenses it into a
//! [`SourceResult`]. Upstream payloads are decoded into explicit records here
//! and never leave this module in their native shape.

mod azure;
pub mod azure_ml;
pub mod azure_monitor;
pub mod fixture;
pub mod jira;
pub mod shell;

pub use azure_ml::AzureMlCollector;
pub use azure_monitor::AzureMonitorCollector;
pub use fixture::FixtureCollector;
pub use jira::JiraCollector;
pub use shell::ShellCollector;

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::domain::{SourceId, SourceResult};
use crate::error::{Result, VigilError};

/// One monitored source
#[async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Source this collector reports for
    fn source(&self) -> SourceId;

    /// Fetch and condense the source. Errors are turned into an error result
    /// by [`Collector::collect`].
    async fn fetch(&self) -> Result<SourceResult>;

    /// Fetch, converting any failure into an error result
    async fn collect(&self) -> SourceResult {
        let source = self.source();
        match self.fetch().await {
            Ok(result) => result,
            Err(e) => {
                error!("{} collector failed: {}", source, e);
                SourceResult::failed(source, e.to_string())
            }
        }
    }
}

/// Build one collector per enabled source
pub fn build_collectors(config: &AppConfig) -> Result<Vec<Arc<dyn Collector>>> {
    let timeout = config.sources.collector_timeout();
    let mut collectors: Vec<Arc<dyn Collector>> = Vec::with_capacity(config.sources.enabled.len());

    for id in &config.sources.enabled {
        let collector: Arc<dyn Collector> = match id {
            SourceId::AzureMl => Arc::new(AzureMlCollector::new(
                config.azure.clone(),
                config.azure_ml.clone(),
                config.sources.lookback_hours,
                http_client(timeout)?,
            )),
            SourceId::AzureMonitor => Arc::new(AzureMonitorCollector::new(
                config.azure.clone(),
                config.azure_monitor.clone(),
                config.sources.lookback_hours,
                http_client(timeout)?,
            )),
            SourceId::Jira => Arc::new(JiraCollector::new(config.jira.clone(), http_client(timeout)?)),
            SourceId::Shell => Arc::new(ShellCollector::new(config.shell.clone())),
        };
        collectors.push(collector);
    }

    info!(
        "Built {} collectors: {}",
        collectors.len(),
        config
            .sources
            .enabled
            .iter()
            .map(SourceId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(collectors)
}

/// Canned collectors for dry runs
pub fn fixture_collectors(enabled: &[SourceId]) -> Vec<Arc<dyn Collector>> {
    enabled
        .iter()
        .map(|id| Arc::new(FixtureCollector::new(*id)) as Arc<dyn Collector>)
        .collect()
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| VigilError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-2xx response into an upstream error
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(VigilError::Upstream {
        status,
        body: truncate_chars(&body, 500),
    })
}

/// Cut a string to at most `max` characters on a char boundary
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
