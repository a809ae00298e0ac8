//! Delivery of a finished run: JSON archive and optional Teams summary

pub mod archive;
pub mod teams;

pub use archive::write_archive;
pub use teams::TeamsNotifier;

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::DeliveryConfig;
use crate::domain::{Report, Snapshot};
use crate::error::Result;

/// Archive the run and notify Teams when configured.
///
/// A Teams failure is logged only. An archive failure is returned after the
/// Teams attempt has been made.
pub async fn deliver(config: &DeliveryConfig, report: &Report, snapshot: &Snapshot) -> Result<PathBuf> {
    let archived = write_archive(&config.report_dir, report, snapshot).await;
    if let Err(e) = &archived {
        error!("Archive failed: {}", e);
    }

    match config.teams_webhook_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => {
            let path = archived.as_ref().ok().map(PathBuf::as_path);
            match TeamsNotifier::new(url.to_string()) {
                Ok(notifier) => match notifier.notify_report(report, snapshot, path).await {
                    Ok(()) => info!("Teams notification sent"),
                    Err(e) => error!("Teams delivery failed: {}", e),
                },
                Err(e) => error!("Teams delivery failed: {}", e),
            }
        }
        None => warn!("No Teams webhook configured, skipping notification"),
    }

    archived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fallback_report;
    use crate::domain::SourceId;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_deliver_without_webhook_archives() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeliveryConfig {
            report_dir: dir.path().to_path_buf(),
            teams_webhook_url: None,
        };
        let snapshot = Snapshot::assemble(BTreeMap::new());
        let report = fallback_report(&snapshot, &[SourceId::Shell], "no service");

        let path = deliver(&config, &report, &snapshot).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_does_not_fail_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeliveryConfig {
            report_dir: dir.path().to_path_buf(),
            teams_webhook_url: Some("http://127.0.0.1:9/webhook".to_string()),
        };
        let snapshot = Snapshot::assemble(BTreeMap::new());
        let report = fallback_report(&snapshot, &[SourceId::Shell], "no service");

        tokio_test::assert_ok!(deliver(&config, &report, &snapshot).await);
    }
}
