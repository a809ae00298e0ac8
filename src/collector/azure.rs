//! Client-credential token acquisition shared by the Azure collectors

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::ensure_success;
use crate::config::AzureCredentials;
use crate::error::{Result, VigilError};

pub(crate) const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
pub(crate) const LOG_ANALYTICS_SCOPE: &str = "https://api.loganalytics.io/.default";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Fetch a bearer token for `scope` using the service principal
pub(crate) async fn fetch_token(
    http: &Client,
    credentials: &AzureCredentials,
    scope: &str,
) -> Result<String> {
    let url = format!(
        "{}/{}/oauth2/v2.0/token",
        credentials.authority.trim_end_matches('/'),
        credentials.tenant_id
    );

    debug!("Requesting Azure token for scope {}", scope);
    let response = http
        .post(&url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", scope),
        ])
        .send()
        .await?;

    let token: TokenResponse = ensure_success(response)
        .await
        .map_err(|e| VigilError::Internal(format!("Azure authentication failed: {}", e)))?
        .json()
        .await?;

    Ok(token.access_token)
}
