//! Background pruning of old sync log entries

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::HousekeepingConfig;
use crate::db::LibSqlSyncLogStore;
use crate::error::Result;
use crate::store::SyncLogStore;
use crate::util::now_millis;

/// Delete log entries that started more than `retention` before `now`
pub async fn prune_expired<S: SyncLogStore>(
    store: &S,
    retention: Duration,
    now: i64,
) -> Result<u64> {
    let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
    store.prune_older_than(now.saturating_sub(retention_ms)).await
}

/// Handle to the periodic pruning task
///
/// The task runs once immediately, then every `interval`. It stops when the
/// handle is dropped.
#[derive(Debug)]
pub struct Housekeeping {
    handle: JoinHandle<()>,
}

impl Housekeeping {
    /// Start pruning `store` on the current tokio runtime
    pub fn spawn(store: LibSqlSyncLogStore, config: HousekeepingConfig) -> Self {
        let retention = config.retention();
        let period = config.interval().max(Duration::from_secs(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match prune_expired(&store, retention, now_millis()).await {
                    Ok(0) => tracing::debug!("Sync log housekeeping: nothing to prune"),
                    Ok(removed) => {
                        tracing::info!(removed, "Pruned expired sync log entries");
                    }
                    Err(error) => {
                        tracing::warn!(%error, "Sync log housekeeping failed");
                    }
                }
            }
        });

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Housekeeping {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
