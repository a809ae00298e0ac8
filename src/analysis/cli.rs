//! Narrative service over the local `claude` CLI in print mode

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::{AnalysisRequest, NarrativeService};
use crate::config::AnalysisConfig;
use crate::error::{Result, VigilError};

/// Environment variable the CLI reads its output-token bound from
const MAX_OUTPUT_TOKENS_ENV: &str = "CLAUDE_CODE_MAX_OUTPUT_TOKENS";

/// Runs one `claude --print` subprocess per request
pub struct ClaudeCliService {
    cli_path: String,
    model: String,
    timeout: Duration,
}

impl ClaudeCliService {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            cli_path: config.cli_path.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn command(&self, request: &AnalysisRequest) -> Command {
        let mut cmd = Command::new(&self.cli_path);
        cmd.arg("--print")
            .arg("--output-format")
            .arg("text")
            .arg("--model")
            .arg(&self.model)
            .arg("--system-prompt")
            .arg(&request.preamble)
            .env(MAX_OUTPUT_TOKENS_ENV, request.max_tokens.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl NarrativeService for ClaudeCliService {
    async fn complete(&self, request: &AnalysisRequest) -> Result<String> {
        debug!("Spawning {} process", self.cli_path);
        let mut child = self.command(request).spawn().map_err(|e| {
            VigilError::AnalysisService(format!("Failed to spawn {}: {}", self.cli_path, e))
        })?;

        let prompt = request.user_prompt();
        let cli_path = self.cli_path.as_str();
        let exchange = async move {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(prompt.as_bytes()).await.map_err(|e| {
                    VigilError::AnalysisService(format!("Failed to write prompt to stdin: {}", e))
                })?;
            }
            let output = child.wait_with_output().await.map_err(|e| {
                VigilError::AnalysisService(format!("Failed to read {} output: {}", cli_path, e))
            })?;
            Ok::<_, VigilError>(output)
        };

        let output = timeout(self.timeout, exchange).await.map_err(|_| {
            VigilError::Timeout(format!(
                "{} did not answer within {}s",
                self.cli_path,
                self.timeout.as_secs()
            ))
        })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VigilError::AnalysisService(format!(
                "{} exited with {}: {}",
                self.cli_path,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        debug!("CLI reply received: {} chars", text.len());
        Ok(text)
    }
}
