use std::env;
use std::sync::{Mutex, OnceLock};
use vigil::config::AnalysisBackend;
use vigil::{AppConfig, SourceId};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> &'static Mutex<()> {
    ENV_LOCK.get_or_init(|| Mutex::new(()))
}

#[derive(Default)]
struct EnvOverride {
    previous: Vec<(String, Option<String>)>,
}

impl EnvOverride {
    fn set(&mut self, key: &str, value: &str) {
        if !self.previous.iter().any(|(existing, _)| existing == key) {
            self.previous.push((key.to_string(), env::var(key).ok()));
        }
        unsafe { env::set_var(key, value) };
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        for (key, value) in self.previous.iter().rev() {
            if let Some(value) = value {
                unsafe { env::set_var(key, value) };
            } else {
                unsafe { env::remove_var(key) };
            }
        }
    }
}

#[test]
fn environment_overrides_file_values() {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("default.toml"),
        r#"
[sources]
enabled = ["azure_ml", "jira"]
lookback_hours = 24

[analysis]
backend = "api"
"#,
    )
    .unwrap();

    let mut vars = EnvOverride::default();
    vars.set("VIGIL__SOURCES__ENABLED", "shell,jira");
    vars.set("VIGIL__SOURCES__LOOKBACK_HOURS", "6");
    vars.set("VIGIL__ANALYSIS__BACKEND", "cli");
    vars.set("VIGIL__ANALYSIS__OWNERS", "SRE,Data Science Team");

    let config = AppConfig::load_from(dir.path()).unwrap();
    assert_eq!(config.sources.enabled, vec![SourceId::Shell, SourceId::Jira]);
    assert_eq!(config.sources.lookback_hours, 6);
    assert_eq!(config.analysis.backend, AnalysisBackend::Cli);
    assert_eq!(config.analysis.owners, vec!["SRE", "Data Science Team"]);
}

#[test]
fn environment_specific_file_layers_over_default() {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("default.toml"),
        "[delivery]\nreport_dir = \"./reports\"\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("production.toml"),
        "[delivery]\nreport_dir = \"/var/lib/vigil/reports\"\nteams_webhook_url = \"https://example.webhook.office.com/x\"\n",
    )
    .unwrap();

    let mut vars = EnvOverride::default();
    vars.set("VIGIL_ENV", "production");

    let config = AppConfig::load_from(dir.path()).unwrap();
    assert_eq!(
        config.delivery.report_dir,
        std::path::PathBuf::from("/var/lib/vigil/reports")
    );
    assert!(config.delivery.teams_webhook_url.is_some());
}

#[test]
fn missing_directory_yields_defaults() {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load_from(dir.path().join("absent")).unwrap();
    assert_eq!(config.sources.enabled, SourceId::ALL.to_vec());
    assert!(config.jira.is_none());
}
