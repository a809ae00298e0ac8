//! JSON archive of each run: report plus the full, unshaped snapshot

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::{Report, Snapshot};
use crate::error::{Result, VigilError};

#[derive(Serialize)]
struct ArchivedRun<'a> {
    report: &'a Report,
    snapshot: &'a Snapshot,
}

/// `health_report_<YYYYmmdd_HHMMSS>.json`
pub fn archive_file_name(at: DateTime<Utc>) -> String {
    format!("health_report_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Write the run archive into `dir`, creating it if needed
pub async fn write_archive(dir: &Path, report: &Report, snapshot: &Snapshot) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        VigilError::Delivery(format!("Cannot create report directory {}: {}", dir.display(), e))
    })?;

    let path = dir.join(archive_file_name(report.generated_at));
    let json = serde_json::to_vec_pretty(&ArchivedRun { report, snapshot })?;

    tokio::fs::write(&path, json).await.map_err(|e| {
        VigilError::Delivery(format!("Cannot write {}: {}", path.display(), e))
    })?;

    info!("Report archived: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fallback_report;
    use crate::domain::{SourceId, SourceResult, Status};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn snapshot() -> Snapshot {
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceId::Jira,
            SourceResult::new(SourceId::Jira, Status::Warning).with_fact("open_high_priority", 3usize),
        );
        Snapshot::assemble(sources)
    }

    #[test]
    fn test_archive_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 12, 1, 7, 5, 9).unwrap();
        assert_eq!(archive_file_name(at), "health_report_20241201_070509.json");
    }

    #[tokio::test]
    async fn test_write_archive_holds_report_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("reports");
        let snapshot = snapshot();
        let report = fallback_report(&snapshot, &[SourceId::Jira], "service unavailable");

        let path = write_archive(&target, &report, &snapshot).await.unwrap();
        assert!(path.starts_with(&target));

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let back: Report = serde_json::from_value(written["report"].clone()).unwrap();
        let snap: Snapshot = serde_json::from_value(written["snapshot"].clone()).unwrap();
        assert_eq!(back, report);
        assert_eq!(snap, snapshot);
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_delivery_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let snapshot = snapshot();
        let report = fallback_report(&snapshot, &[SourceId::Jira], "x");
        let err = write_archive(&blocker.join("reports"), &report, &snapshot)
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::Delivery(_)));
    }
}
