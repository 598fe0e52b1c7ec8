//! Expiry reaper background task.
//!
//! Periodically sweeps the hold ledger and releases holds whose TTL has
//! elapsed, refunding their amounts. The sweep reuses the same guarded
//! state transition as an explicit release, so racing with a concurrent
//! commit or release is a skip, never a double refund.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use creditgate_store::Store;

/// Spawn the expiry reaper on the given interval.
///
/// The task runs for the lifetime of the process; sweep errors are logged
/// and the loop continues.
pub fn spawn(store: Arc<dyn Store>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_seconds = %interval.as_secs(), "Expiry reaper started");

        loop {
            ticker.tick().await;

            match store.release_expired(Utc::now()) {
                Ok(0) => {}
                Ok(count) => {
                    tracing::info!(count = %count, "Reaper reclaimed expired holds");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Reaper sweep failed");
                }
            }
        }
    })
}
