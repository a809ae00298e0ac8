//! Concurrent collection of every configured source into one snapshot

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::collector::Collector;
use crate::domain::{Snapshot, SourceId, SourceResult};

/// Run every collector concurrently and assemble the snapshot.
///
/// Each collector runs in its own task. A collector that errors, panics or
/// is still running when `deadline` expires is recorded as an error result;
/// the others are unaffected. The returned snapshot holds exactly one entry
/// per collector source.
pub async fn collect_all(collectors: &[Arc<dyn Collector>], deadline: Duration) -> Snapshot {
    let started = Instant::now();
    // None when the deadline is beyond what `Instant` can represent
    let expires = started.checked_add(deadline);

    let handles: Vec<(SourceId, JoinHandle<SourceResult>)> = collectors
        .iter()
        .map(|collector| {
            let id = collector.source();
            let collector = Arc::clone(collector);
            (id, tokio::spawn(async move { collector.collect().await }))
        })
        .collect();

    info!("Dispatched {} collectors", handles.len());

    let mut results: BTreeMap<SourceId, SourceResult> = BTreeMap::new();
    for (id, mut handle) in handles {
        let joined = match expires {
            Some(at) => timeout_at(at, &mut handle).await,
            None => Ok((&mut handle).await),
        };
        let result = match joined {
            Ok(Ok(mut result)) => {
                if result.source != id {
                    warn!(
                        "Collector for {} reported source {}, keeping {}",
                        id, result.source, id
                    );
                    result.source = id;
                }
                result
            }
            Ok(Err(join_error)) => {
                error!("{} collector task failed: {}", id, join_error);
                SourceResult::failed(id, format!("Collector task failed: {}", join_error))
            }
            Err(_) => {
                handle.abort();
                error!("{} collector still running after {:?}, aborted", id, deadline);
                SourceResult::failed(
                    id,
                    format!("Collection timed out after {}s", deadline.as_secs()),
                )
            }
        };

        info!("  {} {}: {}", result.status.emoji(), id, result.status);
        if results.insert(id, result).is_some() {
            warn!("Duplicate collector for {}, keeping the last result", id);
        }
    }

    let snapshot = Snapshot::assemble(results);
    info!(
        "Collection complete in {:?}. Overall status: {}",
        started.elapsed(),
        snapshot.overall_status
    );
    snapshot
}
