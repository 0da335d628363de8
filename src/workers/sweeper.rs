use anyhow::Result;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::infrastructure::storage::{paths, Storage};
use crate::modules::pipeline::quarantine::FailureLog;
use crate::state::AppState;

const QUARANTINE_PREFIX: &str = "failed";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub purged: usize,
    pub errors: usize,
}

/// Periodically purge quarantined uploads past the retention window.
pub async fn start_retention_sweeper(state: AppState) {
    let mut ticker = tokio::time::interval(Duration::from_secs(state.config.sweep_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        "Retention sweeper running every {}s, window {} days",
        state.config.sweep_interval_secs, state.config.failed_retention_days
    );

    loop {
        ticker.tick().await;

        let cutoff =
            OffsetDateTime::now_utc() - time::Duration::days(state.config.failed_retention_days);
        match sweep_quarantine(&state.storage, cutoff).await {
            Ok(stats) => {
                if stats.purged > 0 || stats.errors > 0 {
                    info!(
                        "Quarantine sweep: {} scanned, {} purged, {} errors",
                        stats.scanned, stats.purged, stats.errors
                    );
                }
            }
            Err(e) => error!("Quarantine sweep failed: {}", e),
        }
    }
}

/// One pass over the quarantine store. Re-running with nothing expired is a
/// no-op, and a bad entry never stops the rest of the sweep.
pub async fn sweep_quarantine(storage: &Storage, cutoff: OffsetDateTime) -> Result<SweepStats> {
    let mut stats = SweepStats::default();

    for entry in storage.list_dirs(QUARANTINE_PREFIX).await? {
        stats.scanned += 1;
        match purge_if_expired(storage, &entry, cutoff).await {
            Ok(true) => stats.purged += 1,
            Ok(false) => {}
            Err(e) => {
                stats.errors += 1;
                error!("Skipping quarantine entry {}: {}", entry, e);
            }
        }
    }

    Ok(stats)
}

async fn purge_if_expired(
    storage: &Storage,
    entry: &str,
    cutoff: OffsetDateTime,
) -> Result<bool> {
    let log_key = format!("{}/{}/{}", QUARANTINE_PREFIX, entry, paths::FAILURE_LOG_FILE);
    let log: FailureLog = serde_json::from_slice(&storage.read(&log_key).await?)?;

    if log.timestamp >= cutoff {
        return Ok(false);
    }

    storage
        .delete_prefix(&format!("{}/{}", QUARANTINE_PREFIX, entry))
        .await?;
    info!("Deleted expired quarantine entry {}", entry);
    Ok(true)
}
