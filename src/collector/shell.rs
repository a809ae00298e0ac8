//! Local health checks: built-in disk and process checks plus configured
//! scripts
//!
//! Scripts signal health through their exit code: 0 healthy, 1 warning,
//! 2 critical. Any other code is treated as critical.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{truncate_chars, Collector};
use crate::config::ShellConfig;
use crate::domain::{SourceId, SourceResult, Status};
use crate::error::Result;

const BUILTIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    pub status: Status,
    pub output: String,
    pub exit_code: i32,
}

impl CheckResult {
    fn failed(name: &str, script: Option<String>, output: String) -> Self {
        Self {
            name: name.to_string(),
            script,
            status: Status::Error,
            output,
            exit_code: -1,
        }
    }
}

pub fn status_for_exit_code(code: i32) -> Status {
    match code {
        0 => Status::Healthy,
        1 => Status::Warning,
        _ => Status::Critical,
    }
}

/// Any critical check makes the source critical; warnings and check errors
/// make it a warning.
pub fn overall_status(checks: &[CheckResult]) -> Status {
    if checks.iter().any(|c| c.status == Status::Critical) {
        Status::Critical
    } else if checks
        .iter()
        .any(|c| matches!(c.status, Status::Warning | Status::Error))
    {
        Status::Warning
    } else {
        Status::Healthy
    }
}

/// Mounts at or above `threshold` percent from `df --output=target,pcent`
pub fn high_usage_mounts(df_output: &str, threshold: u8) -> Vec<String> {
    df_output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let mount = parts.next()?;
            let pct = parts.next()?;
            if parts.next().is_some() {
                return None;
            }
            let usage: u8 = pct.trim_end_matches('%').parse().ok()?;
            (usage >= threshold).then(|| format!("{}: {}", mount, pct))
        })
        .collect()
}

async fn run_command(program: &Path, args: &[&str], limit: Duration) -> std::io::Result<Option<std::process::Output>> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    match timeout(limit, child.wait_with_output()).await {
        Ok(output) => output.map(Some),
        Err(_) => Ok(None),
    }
}

/// Runs the built-in checks and configured scripts
pub struct ShellCollector {
    config: ShellConfig,
}

impl ShellCollector {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    async fn disk_usage_check(&self) -> CheckResult {
        const NAME: &str = "disk_usage_check";
        let output = match run_command(Path::new("df"), &["-h", "--output=target,pcent"], BUILTIN_TIMEOUT).await {
            Ok(Some(output)) => output,
            Ok(None) => return CheckResult::failed(NAME, None, "df timed out".to_string()),
            Err(e) => return CheckResult::failed(NAME, None, e.to_string()),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let threshold = self.config.disk_usage_threshold_pct;
        let high = high_usage_mounts(&stdout, threshold);

        let (status, text) = if high.is_empty() {
            (Status::Healthy, format!("All mount points under {}% usage", threshold))
        } else {
            (Status::Critical, format!("High disk usage detected: {}", high.join(", ")))
        };

        CheckResult {
            name: NAME.to_string(),
            script: None,
            status,
            output: text,
            exit_code: 0,
        }
    }

    async fn process_check(&self) -> CheckResult {
        const NAME: &str = "process_check";
        let pattern = self.config.process_pattern.as_str();
        let output = match run_command(Path::new("pgrep"), &["-a", "-f", pattern], BUILTIN_TIMEOUT).await {
            Ok(Some(output)) => output,
            Ok(None) => return CheckResult::failed(NAME, None, "pgrep timed out".to_string()),
            Err(e) => return CheckResult::failed(NAME, None, e.to_string()),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let running = stdout.lines().filter(|l| !l.trim().is_empty()).count();

        CheckResult {
            name: NAME.to_string(),
            script: None,
            status: Status::Healthy,
            output: format!("{} '{}' process(es) running", running, pattern),
            exit_code: 0,
        }
    }

    async fn run_script(&self, path: &Path) -> CheckResult {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let script = Some(path.display().to_string());

        if !path.exists() {
            return CheckResult::failed(&name, script, format!("Script not found: {}", path.display()));
        }

        let limit = Duration::from_secs(self.config.script_timeout_secs);
        debug!("Running health script {}", path.display());

        match run_command(path, &[], limit).await {
            Ok(Some(output)) => {
                let code = output.status.code().unwrap_or(-1);
                let text = format!(
                    "{}{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                );
                CheckResult {
                    name,
                    script,
                    status: status_for_exit_code(code),
                    output: truncate_chars(text.trim(), self.config.output_cap),
                    exit_code: code,
                }
            }
            Ok(None) => CheckResult {
                name,
                script,
                status: Status::Critical,
                output: format!("Script timed out after {}s", self.config.script_timeout_secs),
                exit_code: -1,
            },
            Err(e) => CheckResult::failed(&name, script, e.to_string()),
        }
    }
}

fn build_result(checks: Vec<CheckResult>) -> SourceResult {
    let count = |status: Status| checks.iter().filter(|c| c.status == status).count();

    SourceResult::new(SourceId::Shell, overall_status(&checks))
        .with_fact("total_checks", checks.len())
        .with_fact("healthy", count(Status::Healthy))
        .with_fact("warnings", count(Status::Warning))
        .with_fact("critical", count(Status::Critical))
        .with_fact("errors", count(Status::Error))
        .with_detail("checks", json!(checks))
}

#[async_trait]
impl Collector for ShellCollector {
    fn source(&self) -> SourceId {
        SourceId::Shell
    }

    async fn fetch(&self) -> Result<SourceResult> {
        info!("Running shell health checks...");

        let mut checks = vec![self.disk_usage_check().await, self.process_check().await];
        for script in &self.config.scripts {
            checks.push(self.run_script(script).await);
        }

        let result = build_result(checks);
        info!("Shell checks: {:?} ({:?})", result.status, result.summary);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: Status) -> CheckResult {
        CheckResult {
            name: "c".into(),
            script: None,
            status,
            output: String::new(),
            exit_code: 0,
        }
    }

    #[test]
    fn test_status_for_exit_code() {
        assert_eq!(status_for_exit_code(0), Status::Healthy);
        assert_eq!(status_for_exit_code(1), Status::Warning);
        assert_eq!(status_for_exit_code(2), Status::Critical);
        assert_eq!(status_for_exit_code(127), Status::Critical);
    }

    #[test]
    fn test_overall_status() {
        assert_eq!(overall_status(&[]), Status::Healthy);
        assert_eq!(
            overall_status(&[check(Status::Healthy), check(Status::Error)]),
            Status::Warning
        );
        assert_eq!(
            overall_status(&[check(Status::Warning), check(Status::Critical)]),
            Status::Critical
        );
    }

    #[test]
    fn test_high_usage_mounts() {
        let df = "Mounted on Use%\n/ 42%\n/mnt/mldata 91%\n/boot 90%\n/var 89%\ngarbage\n";
        assert_eq!(
            high_usage_mounts(df, 90),
            vec!["/mnt/mldata: 91%".to_string(), "/boot: 90%".to_string()]
        );
    }

    #[test]
    fn test_build_result_counts() {
        let result = build_result(vec![
            check(Status::Healthy),
            check(Status::Warning),
            check(Status::Error),
        ]);
        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.fact("total_checks").and_then(|v| v.as_count()), Some(3));
        assert_eq!(result.fact("errors").and_then(|v| v.as_count()), Some(1));
        assert_eq!(result.fact("critical").and_then(|v| v.as_count()), Some(0));
    }

    #[tokio::test]
    async fn test_missing_script_is_error_check() {
        let collector = ShellCollector::new(ShellConfig::default());
        let check = collector.run_script(Path::new("/nonexistent/check_gpu.sh")).await;
        assert_eq!(check.status, Status::Error);
        assert_eq!(check.name, "check_gpu.sh");
        assert!(check.output.contains("Script not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_exit_code_maps_to_status() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warn.sh");
        std::fs::write(&path, "#!/bin/sh\necho 'queue depth high'\nexit 1\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let collector = ShellCollector::new(ShellConfig::default());
        let check = collector.run_script(&path).await;
        assert_eq!(check.status, Status::Warning);
        assert_eq!(check.exit_code, 1);
        assert_eq!(check.output, "queue depth high");
    }
}
