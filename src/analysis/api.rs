//! Anthropic Messages API client
//!
//! Sends the instruction preamble as the system prompt and the facts header
//! plus shaped snapshot as a single user message. No retries.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{AnalysisRequest, NarrativeService};
use crate::config::AnalysisConfig;
use crate::error::{Result, VigilError};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// First text block of a Messages API response
fn first_text(response: MessagesResponse) -> Option<String> {
    response
        .content
        .into_iter()
        .find(|b| b.kind == "text")
        .and_then(|b| b.text)
}

/// Narrative service backed by the hosted Messages API
pub struct ClaudeApiService {
    api_key: Option<String>,
    base_url: String,
    model: String,
    http: Client,
}

impl ClaudeApiService {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VigilError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            http,
        })
    }
}

#[async_trait]
impl NarrativeService for ClaudeApiService {
    async fn complete(&self, request: &AnalysisRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| VigilError::AnalysisService("API key not configured".to_string()))?;

        let user_prompt = request.user_prompt();
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: &request.preamble,
            messages: vec![Message {
                role: "user",
                content: &user_prompt,
            }],
        };

        debug!("Sending request to Messages API ({})", self.model);
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| VigilError::AnalysisService(format!("Messages API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!("Messages API error: {} - {}", status, text);
            return Err(VigilError::AnalysisService(format!(
                "Messages API error: {} - {}",
                status, text
            )));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            VigilError::AnalysisService(format!("Failed to parse Messages API response: {}", e))
        })?;

        let text = first_text(parsed).ok_or_else(|| {
            VigilError::AnalysisService("Messages API response has no text content".to_string())
        })?;
        debug!("Messages API reply received: {} chars", text.len());
        Ok(text)
    }
}
