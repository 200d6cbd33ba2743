//! Time-based cache of the project table.
//!
//! The snapshot is replaced wholesale on every refresh, never merged.
//! Concurrent refreshes may race; the last one to finish wins.

use ledgerline_core::{LedgerResult, ProjectTable};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default freshness window of a snapshot.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct Snapshot {
    table: Arc<ProjectTable>,
    fetched_at: Instant,
    invalidated: bool,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.invalidated && self.fetched_at.elapsed() < ttl
    }
}

/// Refresh-on-expiry holder of the flattened project table.
#[derive(Debug)]
pub struct TableCache {
    ttl: Duration,
    slot: RwLock<Option<Snapshot>>,
}

impl TableCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Return the cached table, refreshing it with `fetch` when missing or expired.
    ///
    /// A failed refresh falls back to the previous snapshot, however old.
    /// The error only reaches the caller when there is nothing to fall back on.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> LedgerResult<Arc<ProjectTable>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LedgerResult<ProjectTable>>,
    {
        let previous = self.slot.read().await.clone();
        if let Some(snapshot) = previous.as_ref().filter(|s| s.is_fresh(self.ttl)) {
            return Ok(Arc::clone(&snapshot.table));
        }

        match fetch().await {
            Ok(table) => {
                let table = Arc::new(table);
                tracing::info!(rows = table.len(), "refreshed project table");
                *self.slot.write().await = Some(Snapshot {
                    table: Arc::clone(&table),
                    fetched_at: Instant::now(),
                    invalidated: false,
                });
                Ok(table)
            }
            Err(err) => match previous {
                Some(stale) => {
                    tracing::warn!(
                        error = %err,
                        age_secs = stale.fetched_at.elapsed().as_secs(),
                        "project table refresh failed; serving stale snapshot"
                    );
                    Ok(stale.table)
                }
                None => Err(err),
            },
        }
    }

    /// Force the next read to refresh.
    ///
    /// The current snapshot is kept as the fallback for a failed refresh.
    pub async fn invalidate(&self) {
        if let Some(snapshot) = self.slot.write().await.as_mut() {
            snapshot.invalidated = true;
        }
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
