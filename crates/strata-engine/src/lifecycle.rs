//! Respawn sweeps, global yield regeneration, and session cleanup (spec
//! §4.5).

use rusqlite::Connection;
use strata_primitives::{ChunkCoord, Clock, StorageError};
use strata_store::Store;
use tracing::debug;

pub struct LifecycleManager<'a> {
    store: &'a Store,
}

impl<'a> LifecycleManager<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Per-chunk respawn sweep, run by the Chunk Service after generation
    /// (spec §4.5 "Respawn sweep").
    pub fn respawn_sweep(&self, conn: &Connection, coord: ChunkCoord, clock: &dyn Clock) -> Result<usize, StorageError> {
        let now = clock.now();
        let due = self.store.get_nodes_to_respawn(conn, coord, now)?;
        for node_id in &due {
            let node = self.store.get_node(conn, *node_id)?;
            let Some(node) = node else { continue };
            self.store.reactivate_node(conn, *node_id, node.max_yield)?;
        }
        if !due.is_empty() {
            debug!(chunk = %coord, reactivated = due.len(), "respawn sweep");
            crate::metrics::RESPAWN_SWEEP_SIZE.inc_by(due.len() as u64);
        }
        Ok(due.len())
    }

    /// Periodic global regeneration (spec §4.5 "Global regeneration (periodic,
    /// 1 hour)"): a single set-based update across every active, non-full node.
    pub fn regenerate_yield(&self, conn: &Connection) -> Result<usize, StorageError> {
        let touched = self.store.regenerate_yield_on_all_active_nodes(conn)?;
        debug!(touched, "regenerated yield on active nodes");
        crate::metrics::REGEN_SWEEP_SIZE.inc_by(touched as u64);
        Ok(touched)
    }

    /// Periodic session cleanup (spec §4.5 "Session cleanup (periodic, 5
    /// minutes)").
    pub fn cleanup_sessions(&self, conn: &Connection, clock: &dyn Clock) -> Result<usize, StorageError> {
        let deleted = self.store.delete_expired_sessions(conn, clock.now())?;
        if deleted > 0 {
            debug!(deleted, "swept expired sessions");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rusqlite::Connection as RConn;
    use strata_primitives::{FakeClock, LocalPos};
    use strata_store::{build_pool, run_migrations, NewNode, PoolConfig};

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

    #[test]
    fn respawn_sweep_reactivates_due_nodes_only() {
        let (store, _file) = setup();
        let conn = store.conn().unwrap();
        let coord = ChunkCoord::new(0, 0);
        store.ensure_chunk(&conn, coord, Utc::now()).unwrap();

        let node = store
            .create_node(
                &conn,
                NewNode {
                    chunk: coord,
                    local: LocalPos::new(0, 0),
                    node_type: 1,
                    node_subtype: None,
                    max_yield: 10,
                    regeneration_rate: 0,
                    spawn_type: 0,
                    spawned_at: Utc::now(),
                },
                10,
            )
            .unwrap();

        let clock = FakeClock::new(Utc::now());
        store.deactivate_node(&conn, node.node_id, clock.now() + chrono::Duration::hours(1), clock.now()).unwrap();

        let lifecycle = LifecycleManager::new(&store);
        let reactivated_before = lifecycle.respawn_sweep(&conn, coord, &clock).unwrap();
        assert_eq!(reactivated_before, 0, "timer has not elapsed yet");

        clock.advance(chrono::Duration::hours(1));
        let reactivated_after = lifecycle.respawn_sweep(&conn, coord, &clock).unwrap();
        assert_eq!(reactivated_after, 1);

        let refreshed = store.get_node(&conn, node.node_id).unwrap().unwrap();
        assert!(refreshed.is_active);
        assert_eq!(refreshed.current_yield, refreshed.max_yield);
    }

    #[test]
    fn regeneration_caps_at_max_yield() {
        let (store, _file) = setup();
        let conn = store.conn().unwrap();
        let coord = ChunkCoord::new(3, 3);
        store.ensure_chunk(&conn, coord, Utc::now()).unwrap();

        let node = store
            .create_node(
                &conn,
                NewNode {
                    chunk: coord,
                    local: LocalPos::new(1, 1),
                    node_type: 1,
                    node_subtype: None,
                    max_yield: 10,
                    regeneration_rate: 7,
                    spawn_type: 0,
                    spawned_at: Utc::now(),
                },
                10,
            )
            .unwrap();
        store.update_node_yield(&conn, node.node_id, 5).unwrap();

        let lifecycle = LifecycleManager::new(&store);
        lifecycle.regenerate_yield(&conn).unwrap();
        let after_one = store.get_node(&conn, node.node_id).unwrap().unwrap();
        assert_eq!(after_one.current_yield, 10, "5 + 7 should clamp to max_yield of 10");

        lifecycle.regenerate_yield(&conn).unwrap();
        let after_two = store.get_node(&conn, node.node_id).unwrap().unwrap();
        assert_eq!(after_two.current_yield, 10, "already full nodes must not be touched again");
    }
}
