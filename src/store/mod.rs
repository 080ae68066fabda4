//! Process storage: holds phase-1 results until they are dispatched or expire.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

pub use libsql_backend::LibSqlProcessStore;
pub use memory::InMemoryProcessStore;
pub use traits::ProcessStore;

/// Interval between expiry sweeps.
pub const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a background task that purges records older than `ttl` every `every`.
pub fn spawn_expiry_task(
    store: Arc<dyn ProcessStore>,
    ttl: Duration,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(e) = store.purge_expired(ttl).await {
                warn!(error = %e, "Expiry sweep failed");
            }
        }
    })
}
