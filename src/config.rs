use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::SourceId;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Service principal shared by the Azure collectors
    #[serde(default)]
    pub azure: Option<AzureCredentials>,
    #[serde(default)]
    pub azure_ml: Option<AzureMlConfig>,
    #[serde(default)]
    pub azure_monitor: Option<AzureMonitorConfig>,
    #[serde(default)]
    pub jira: Option<JiraConfig>,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Sources to collect from on every run
    #[serde(default = "default_enabled_sources")]
    pub enabled: Vec<SourceId>,
    /// How far back each source looks, in hours
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u64,
    /// Per-request timeout used by the HTTP collectors
    #[serde(default = "default_collector_timeout")]
    pub collector_timeout_secs: u64,
    /// Deadline for the whole fan-out; collectors still running are cut off
    #[serde(default = "default_collection_timeout")]
    pub collection_timeout_secs: u64,
}

fn default_enabled_sources() -> Vec<SourceId> {
    SourceId::ALL.to_vec()
}

/// One year
pub const MAX_LOOKBACK_HOURS: u64 = 24 * 365;
/// One day
pub const MAX_COLLECTION_TIMEOUT_SECS: u64 = 24 * 60 * 60;

fn default_lookback_hours() -> u64 {
    24
}

fn default_collector_timeout() -> u64 {
    60
}

fn default_collection_timeout() -> u64 {
    300
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_sources(),
            lookback_hours: default_lookback_hours(),
            collector_timeout_secs: default_collector_timeout(),
            collection_timeout_secs: default_collection_timeout(),
        }
    }
}

impl SourcesConfig {
    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_secs)
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_secs(self.collection_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
    /// Token endpoint host (override for sovereign clouds)
    #[serde(default = "default_authority")]
    pub authority: String,
}

fn default_authority() -> String {
    "https://login.microsoftonline.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureMlConfig {
    pub workspace: String,
    pub resource_group: String,
    #[serde(default = "default_management_url")]
    pub management_url: String,
}

fn default_management_url() -> String {
    "https://management.azure.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureMonitorConfig {
    /// Log Analytics workspace id
    pub workspace_id: String,
    #[serde(default = "default_log_analytics_url")]
    pub log_analytics_url: String,
}

fn default_log_analytics_url() -> String {
    "https://api.loganalytics.io".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
    pub url: String,
    pub email: String,
    pub api_token: String,
    #[serde(default = "default_project_key")]
    pub project_key: String,
    /// Priorities counted as high priority
    #[serde(default = "default_priorities")]
    pub priorities: Vec<String>,
}

fn default_project_key() -> String {
    "MLPLAT".to_string()
}

fn default_priorities() -> Vec<String> {
    ["P1", "P2", "High", "Critical"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
    /// Extra health-check scripts: exit 0 healthy, 1 warning, 2 critical
    #[serde(default)]
    pub scripts: Vec<PathBuf>,
    #[serde(default = "default_script_timeout")]
    pub script_timeout_secs: u64,
    /// Mount usage at or above this percentage is critical
    #[serde(default = "default_disk_threshold")]
    pub disk_usage_threshold_pct: u8,
    /// Process pattern the built-in process check looks for
    #[serde(default = "default_process_pattern")]
    pub process_pattern: String,
    /// Maximum captured output per check, in characters
    #[serde(default = "default_output_cap")]
    pub output_cap: usize,
}

fn default_script_timeout() -> u64 {
    30
}

fn default_disk_threshold() -> u8 {
    90
}

fn default_process_pattern() -> String {
    "python".to_string()
}

fn default_output_cap() -> usize {
    2000
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            scripts: Vec::new(),
            script_timeout_secs: default_script_timeout(),
            disk_usage_threshold_pct: default_disk_threshold(),
            process_pattern: default_process_pattern(),
            output_cap: default_output_cap(),
        }
    }
}

/// Narrative service backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisBackend {
    /// Anthropic Messages API over HTTP
    Api,
    /// Local `claude` CLI in print mode
    Cli,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_backend")]
    pub backend: AnalysisBackend,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Output bound passed to the narrative service
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_analysis_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_cli_path")]
    pub cli_path: String,
    /// Accepted owners for recommended actions (empty accepts any)
    #[serde(default = "default_owners")]
    pub owners: Vec<String>,
    /// Items kept from success-only lists in the shaped payload
    #[serde(default = "default_success_list_cap")]
    pub success_list_cap: usize,
}

fn default_backend() -> AnalysisBackend {
    AnalysisBackend::Api
}

fn default_api_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-6".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_analysis_timeout() -> u64 {
    120
}

fn default_cli_path() -> String {
    "claude".to_string()
}

fn default_owners() -> Vec<String> {
    ["Platform Engineer", "Data Science Team", "Management"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_success_list_cap() -> usize {
    crate::shaper::DEFAULT_LIST_CAP
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            api_key: None,
            base_url: default_api_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_analysis_timeout(),
            cli_path: default_cli_path(),
            owners: default_owners(),
            success_list_cap: default_success_list_cap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Directory for archived report + snapshot JSON
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    #[serde(default)]
    pub teams_webhook_url: Option<String>,
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("./reports")
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
            teams_webhook_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives used when RUST_LOG is unset (e.g. "info,vigil=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info,vigil=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("VIGIL_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (VIGIL__JIRA__API_TOKEN, etc.)
            .add_source(
                Environment::with_prefix("VIGIL")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("sources.enabled")
                    .with_list_parse_key("shell.scripts")
                    .with_list_parse_key("jira.priorities")
                    .with_list_parse_key("analysis.owners")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Enabled sources whose configuration section is missing. Their
    /// collectors still run and report an error result.
    pub fn unconfigured_sources(&self) -> Vec<SourceId> {
        self.sources
            .enabled
            .iter()
            .copied()
            .filter(|id| match id {
                SourceId::AzureMl => self.azure.is_none() || self.azure_ml.is_none(),
                SourceId::AzureMonitor => self.azure.is_none() || self.azure_monitor.is_none(),
                SourceId::Jira => self.jira.is_none(),
                SourceId::Shell => false,
            })
            .collect()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.sources.enabled.is_empty() {
            errors.push("sources.enabled must list at least one source".to_string());
        }

        let unique: HashSet<_> = self.sources.enabled.iter().collect();
        if unique.len() != self.sources.enabled.len() {
            errors.push("sources.enabled contains duplicate entries".to_string());
        }

        if self.sources.lookback_hours == 0 || self.sources.lookback_hours > MAX_LOOKBACK_HOURS {
            errors.push(format!(
                "sources.lookback_hours must be between 1 and {}",
                MAX_LOOKBACK_HOURS
            ));
        }

        if self.sources.collection_timeout_secs == 0
            || self.sources.collection_timeout_secs > MAX_COLLECTION_TIMEOUT_SECS
        {
            errors.push(format!(
                "sources.collection_timeout_secs must be between 1 and {}",
                MAX_COLLECTION_TIMEOUT_SECS
            ));
        }

        if self.shell.disk_usage_threshold_pct == 0 || self.shell.disk_usage_threshold_pct > 100 {
            errors.push("shell.disk_usage_threshold_pct must be between 1 and 100".to_string());
        }

        if self.analysis.backend == AnalysisBackend::Api
            && self.analysis.api_key.as_deref().map_or(true, str::is_empty)
        {
            errors.push("analysis.api_key is required for the api backend".to_string());
        }

        if self.analysis.max_tokens == 0 {
            errors.push("analysis.max_tokens must be positive".to_string());
        }

        if self.analysis.success_list_cap == 0 {
            errors.push("analysis.success_list_cap must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.sources.enabled, SourceId::ALL.to_vec());
        assert_eq!(config.sources.lookback_hours, 24);
        assert_eq!(config.sources.collection_timeout(), Duration::from_secs(300));
        assert_eq!(config.analysis.max_tokens, 4096);
        assert_eq!(config.analysis.success_list_cap, 5);
        assert_eq!(config.shell.output_cap, 2000);
    }

    #[test]
    fn test_unconfigured_sources() {
        let config = AppConfig::default();
        assert_eq!(
            config.unconfigured_sources(),
            vec![SourceId::AzureMl, SourceId::AzureMonitor, SourceId::Jira]
        );
    }

    #[test]
    fn test_validate_requires_api_key() {
        let mut config = AppConfig::default();
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("api_key")));

        config.analysis.api_key = Some("sk-test".into());
        assert!(config.validate().is_ok());

        config.analysis.api_key = None;
        config.analysis.backend = AnalysisBackend::Cli;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = AppConfig::default();
        config.analysis.backend = AnalysisBackend::Cli;
        config.sources.enabled = vec![SourceId::Jira, SourceId::Jira];
        config.sources.lookback_hours = 0;
        config.shell.disk_usage_threshold_pct = 120;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_validate_bounds_window_and_deadline() {
        let mut config = AppConfig::default();
        config.analysis.backend = AnalysisBackend::Cli;
        config.sources.lookback_hours = MAX_LOOKBACK_HOURS;
        config.sources.collection_timeout_secs = MAX_COLLECTION_TIMEOUT_SECS;
        assert!(config.validate().is_ok());

        config.sources.lookback_hours = u64::MAX;
        config.sources.collection_timeout_secs = u64::MAX;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("lookback_hours")));
        assert!(errors.iter().any(|e| e.contains("collection_timeout_secs")));
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
[sources]
enabled = ["jira", "shell"]
lookback_hours = 12

[jira]
url = "https://example.atlassian.net"
email = "ops@example.com"
api_token = "secret"

[analysis]
backend = "cli"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.sources.enabled, vec![SourceId::Jira, SourceId::Shell]);
        assert_eq!(config.sources.lookback_hours, 12);
        let jira = config.jira.as_ref().unwrap();
        assert_eq!(jira.project_key, "MLPLAT");
        assert_eq!(jira.priorities.len(), 4);
        assert_eq!(config.analysis.backend, AnalysisBackend::Cli);
        assert!(config.unconfigured_sources().is_empty());
    }
}
