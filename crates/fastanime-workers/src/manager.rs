//! Process-wide `ThreadManager` (design §4.4): registers named pools,
//! forwards shutdown, reports per-pool status. Constructed explicitly by
//! the engine rather than as a lazily-initialized global, per the
//! redesign flag in spec §9 ("no global singleton").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::pool::{PoolStatus, WorkerPool};

#[derive(Default)]
pub struct ThreadManager {
    pools: Mutex<HashMap<String, Arc<WorkerPool>>>,
}

impl ThreadManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pool under its name, starting it if it is not already
    /// running. Returns the existing pool if one with the same name is
    /// already registered (last-writer-wins would silently orphan the
    /// first pool's in-flight tasks, so re-registration is rejected).
    pub fn register(&self, pool: Arc<WorkerPool>) -> WorkerResult<Arc<WorkerPool>> {
        let mut pools = self.pools.lock();
        if let Some(existing) = pools.get(pool.name()) {
            warn!(pool = pool.name(), "pool already registered, ignoring duplicate");
            return Ok(existing.clone());
        }
        pool.start()?;
        pools.insert(pool.name().to_string(), pool.clone());
        Ok(pool)
    }

    pub fn get(&self, name: &str) -> Option<Arc<WorkerPool>> {
        self.pools.lock().get(name).cloned()
    }

    pub fn status(&self, name: &str) -> Option<PoolStatus> {
        self.pools.lock().get(name).map(|pool| pool.status())
    }

    pub fn status_all(&self) -> HashMap<String, PoolStatus> {
        self.pools
            .lock()
            .iter()
            .map(|(name, pool)| (name.clone(), pool.status()))
            .collect()
    }

    /// Shuts down a single named pool.
    pub async fn shutdown(&self, name: &str, wait: bool, timeout: Duration) -> WorkerResult<()> {
        let pool = self
            .pools
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| WorkerError::NotRunning(name.to_string()))?;
        pool.shutdown(wait, timeout).await
    }

    /// Shuts down every registered pool, used by the Session Engine's
    /// clean-shutdown step (design §4.7.6).
    pub async fn shutdown_all(&self, wait: bool, timeout: Duration) {
        let pools: Vec<Arc<WorkerPool>> = self.pools.lock().values().cloned().collect();
        for pool in pools {
            if let Err(e) = pool.shutdown(wait, timeout).await {
                warn!(pool = pool.name(), error = %e, "pool shutdown reported an error");
            }
        }
        info!("all worker pools shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_status_reports_running() {
        let manager = ThreadManager::new();
        let pool = WorkerPool::new("previews", 2);
        manager.register(pool).unwrap();

        let status = manager.status("previews").unwrap();
        assert!(status.running);
        assert_eq!(status.active_tasks, 0);
    }

    #[tokio::test]
    async fn shutdown_all_stops_every_pool() {
        let manager = ThreadManager::new();
        manager.register(WorkerPool::new("a", 2)).unwrap();
        manager.register(WorkerPool::new("b", 2)).unwrap();

        manager.shutdown_all(true, Duration::from_secs(1)).await;

        for name in ["a", "b"] {
            let pool = manager.get(name).unwrap();
            assert!(pool.submit("x", |_| async {}).is_err());
        }
    }
}
