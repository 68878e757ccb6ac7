//! Connection pooling over a single SQLite file (spec §2 "single file by
//! default", §10.7).

use r2d2_sqlite::SqliteConnectionManager;
use std::time::Duration;
use strata_primitives::StorageError;

pub type Pool = r2d2::Pool<SqliteConnectionManager>;
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub conn_max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_open_conns: 10, max_idle_conns: 5, conn_max_lifetime: None }
    }
}

/// Builds a pooled connection to `db_path`, enabling WAL mode so the
/// background scheduler's writes (§4.8) do not stall concurrent chunk reads.
pub fn build_pool(db_path: &str, cfg: &PoolConfig) -> Result<Pool, StorageError> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    });

    r2d2::Pool::builder()
        .max_size(cfg.max_open_conns.max(1))
        .min_idle(Some(cfg.max_idle_conns.min(cfg.max_open_conns.max(1))))
        .max_lifetime(cfg.conn_max_lifetime)
        .build(manager)
        .map_err(|e| StorageError::backend(e.to_string()))
}
