//! SQLite-backed persistence for the world-state engine (spec §2, §6).

pub mod migrations;
pub mod pool;
pub mod rows;
pub mod store;

pub use migrations::run_migrations;
pub use pool::{build_pool, Pool, PoolConfig, PooledConnection};
pub use store::{NewNode, RegisterPlayer, Store};
