//! Background scheduler: periodic regeneration and session cleanup, with
//! cooperative cancellation (spec §4.8).

use crate::lifecycle::LifecycleManager;
use std::sync::Arc;
use std::time::Duration;
use strata_primitives::Clock;
use strata_store::Store;
use tokio::sync::watch;
use tracing::{error, info};

const REGEN_INTERVAL: Duration = Duration::from_secs(60 * 60);
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Drives the two periodic background loops named in spec §4.8. Both tasks
/// finish their current iteration before observing cancellation, so no
/// partial sweep is ever left half-applied (the underlying operations are
/// idempotent anyway).
pub struct Scheduler {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Spawns both loops and returns their join handles plus a sender that,
    /// when dropped or sent `true`, tells both loops to exit after their
    /// current iteration.
    pub fn spawn(self: Arc<Self>) -> (watch::Sender<bool>, Vec<tokio::task::JoinHandle<()>>) {
        let (tx, rx) = watch::channel(false);

        let regen_handle = {
            let scheduler = self.clone();
            let mut rx = rx.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(REGEN_INTERVAL);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if let Err(e) = scheduler.run_regeneration().await {
                                error!(error = %e, "yield regeneration tick failed; continuing on next tick");
                            }
                        }
                        _ = rx.changed() => {
                            if *rx.borrow() {
                                info!("yield regenerator received shutdown signal, exiting");
                                break;
                            }
                        }
                    }
                }
            })
        };

        let cleanup_handle = {
            let scheduler = self.clone();
            let mut rx = rx.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if let Err(e) = scheduler.run_session_cleanup().await {
                                error!(error = %e, "session cleanup tick failed; continuing on next tick");
                            }
                        }
                        _ = rx.changed() => {
                            if *rx.borrow() {
                                info!("session cleaner received shutdown signal, exiting");
                                break;
                            }
                        }
                    }
                }
            })
        };

        (tx, vec![regen_handle, cleanup_handle])
    }

    async fn run_regeneration(&self) -> Result<usize, strata_primitives::StorageError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            LifecycleManager::new(&store).regenerate_yield(&conn)
        })
        .await
        .map_err(|e| strata_primitives::StorageError::backend(e.to_string()))?
    }

    async fn run_session_cleanup(&self) -> Result<usize, strata_primitives::StorageError> {
        let store = self.store.clone();
        let clock = self.clock.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            LifecycleManager::new(&store).cleanup_sessions(&conn, clock.as_ref())
        })
        .await
        .map_err(|e| strata_primitives::StorageError::backend(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection as RConn;
    use strata_primitives::SystemClock;
    use strata_store::{build_pool, run_migrations, PoolConfig};

    fn setup() -> (Store, tempfile::NamedTempFile) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        {
            let mut conn = RConn::open(&path).unwrap();
            run_migrations(&mut conn).unwrap();
        }
        let pool = build_pool(&path, &PoolConfig::default()).unwrap();
        (Store::new(pool), file)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_regeneration_and_cleanup_succeed_on_empty_database() {
        let (store, _file) = setup();
        let scheduler = Scheduler::new(store, Arc::new(SystemClock));
        assert_eq!(scheduler.run_regeneration().await.unwrap(), 0);
        assert_eq!(scheduler.run_session_cleanup().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_signal_stops_both_loops() {
        let (store, _file) = setup();
        let scheduler = Arc::new(Scheduler::new(store, Arc::new(SystemClock)));
        let (tx, handles) = scheduler.spawn();

        tx.send(true).unwrap();
        for handle in handles {
            tokio::time::timeout(std::time::Duration::from_secs(5), handle).await.unwrap().unwrap();
        }
    }
}
