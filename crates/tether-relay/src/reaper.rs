//! Periodic idle-session reaper.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::store::RelayStore;

/// Spawn the background reaper.
///
/// Every `interval` it sweeps connections whose transport task vanished, then
/// deletes inactive sessions older than `idle_ttl`. Active sessions are never
/// touched.
pub fn spawn_reaper(store: RelayStore, interval: Duration, idle_ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // consume first immediate tick

        loop {
            ticker.tick().await;
            let swept = store.sweep_closed().await;
            let reaped = store.reap(Instant::now().into_std(), idle_ttl).await;
            let stats = store.stats().await;
            tracing::debug!(
                swept,
                reaped = reaped.len(),
                sessions = stats.sessions,
                connections = stats.connections,
                "Reaper tick"
            );
        }
    })
}
