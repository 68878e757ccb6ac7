//! World-seed initialization (spec §4.2 "Initialization").

use rand::RngCore;
use rusqlite::Connection;
use strata_store::Store;

const WORLD_SEED_KEY: &str = "world_seed";

/// On first startup, generates a seed from the process RNG and persists it;
/// on subsequent startups, reads it back verbatim.
pub fn load_or_init_world_seed(store: &Store, conn: &Connection) -> Result<u64, strata_primitives::StorageError> {
    if let Some(existing) = store.get_world_config(conn, WORLD_SEED_KEY)? {
        return Ok(existing.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %existing, "stored world_seed was not a valid u64, reseeding");
            rand::thread_rng().next_u64()
        }));
    }

    let seed = rand::thread_rng().next_u64();
    store.set_world_config(conn, WORLD_SEED_KEY, &seed.to_string())?;
    tracing::info!(seed, "initialized new world seed");
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection as RConn;
    use strata_store::{build_pool, run_migrations, PoolConfig};

    #[test]
    fn seed_is_persisted_and_read_back_verbatim() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        {
            let mut conn = RConn::open(&path).unwrap();
            run_migrations(&mut conn).unwrap();
        }
        let pool = build_pool(&path, &PoolConfig::default()).unwrap();
        let store = Store::new(pool);

        let conn = store.conn().unwrap();
        let first = load_or_init_world_seed(&store, &conn).unwrap();
        let second = load_or_init_world_seed(&store, &conn).unwrap();
        assert_eq!(first, second);
    }
}
