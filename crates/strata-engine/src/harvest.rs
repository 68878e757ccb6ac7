//! The transactional harvest operation (spec §4.6).

use crate::player_sink::{HarvestStatsUpdate, PlayerSink};
use std::sync::Arc;
use strata_primitives::{
    Clock, EngineError, HarvestDetails, HarvestError, HarvestResult, LootItem, LootSource, NodeId,
    NodeState, PlayerId, StorageError,
};
use strata_store::Store;
use tracing::warn;

const BASE_YIELD: i32 = 1;

/// What the transaction body decided, before any post-commit side effects
/// run. Carried through `Store::with_transaction`'s `Result<_, StorageError>`
/// channel so a business rejection (no daily attempts left, node missing,
/// ...) commits a no-op transaction instead of forcing a synthetic storage
/// error.
enum Outcome {
    Success { result: HarvestResult, resource_type: i32, resource_subtype: i32, total: i32 },
    Rejected(HarvestError),
}

pub struct HarvestEngine {
    store: Store,
    player_sink: Arc<dyn PlayerSink>,
    clock: Arc<dyn Clock>,
}

impl HarvestEngine {
    pub fn new(store: Store, player_sink: Arc<dyn PlayerSink>, clock: Arc<dyn Clock>) -> Self {
        Self { store, player_sink, clock }
    }

    /// `harvest(playerId, nodeId) -> HarvestResult` (spec §4.6 "Algorithm").
    /// Steps 1-6 run inside one transaction; step 7 is a best-effort,
    /// post-commit side effect that never rolls back the harvest itself.
    pub async fn harvest(&self, player_id: PlayerId, node_id: NodeId) -> Result<HarvestResult, EngineError> {
        crate::metrics::HARVESTS_ATTEMPTED.inc();
        let now = self.clock.now();
        let store = self.store.clone();

        let outcome = tokio::task::spawn_blocking(move || -> Result<Outcome, StorageError> {
            store.with_transaction(|tx| Self::run_transaction(&store, tx, player_id, node_id, now))
        })
        .await
        .map_err(|e| StorageError::backend(e.to_string()))??;

        let (result, resource_type, resource_subtype, total) = match outcome {
            Outcome::Success { result, resource_type, resource_subtype, total } => {
                (result, resource_type, resource_subtype, total)
            }
            Outcome::Rejected(business) => {
                crate::metrics::HARVESTS_FAILED.with_label_values(&[crate::metrics::harvest_failure_reason(&business)]).inc();
                return Err(EngineError::from(business));
            }
        };
        crate::metrics::HARVESTS_SUCCEEDED.inc();

        // spec §4.6 step 7: best-effort, logged, never rolls back the commit.
        if let Err(e) = self.player_sink.add_to_inventory(player_id, resource_type, resource_subtype, total as i64).await {
            warn!(error = %e, player = %player_id, "post-commit inventory update failed");
        }
        if let Err(e) = self
            .player_sink
            .update_harvest_stats(player_id, HarvestStatsUpdate { resource_type, amount_harvested: total as i64 })
            .await
        {
            warn!(error = %e, player = %player_id, "post-commit stats update failed");
        }

        Ok(result)
    }

    fn run_transaction(
        store: &Store,
        tx: &rusqlite::Transaction,
        player_id: PlayerId,
        node_id: NodeId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Outcome, StorageError> {
        // Step 1: daily-limit gate.
        let today = now.date_naive();
        let already = store.get_player_daily_harvest_count(tx, player_id, node_id, today)?;
        if already > 0 {
            return Ok(Outcome::Rejected(HarvestError::AlreadyHarvestedToday));
        }

        // Step 2: re-read the node inside the transaction.
        let node = match store.get_node(tx, node_id)? {
            Some(n) => n,
            None => return Ok(Outcome::Rejected(HarvestError::NodeNotFound)),
        };
        if !node.is_active {
            return Ok(Outcome::Rejected(HarvestError::NodeNotActive));
        }
        if node.current_yield <= 0 {
            return Ok(Outcome::Rejected(HarvestError::NodeDepleted));
        }

        // Step 3: yield computation. Stat/tool bonuses are reserved hooks
        // that currently always contribute zero to the integer total.
        let stat_bonus = 0;
        let tool_bonus = 0;
        let total = (BASE_YIELD + stat_bonus + tool_bonus).min(node.current_yield);

        // Step 4: apply.
        let new_yield = node.current_yield - total;
        let mut respawn_timer = None;
        if new_yield == 0 {
            let hours = store.get_respawn_delay_hours(tx, node.node_type, node.node_subtype)?;
            let timer = now + chrono::Duration::hours(hours);
            store.deactivate_node(tx, node_id, timer, now)?;
            respawn_timer = Some(timer);
        } else {
            store.record_harvest_yield(tx, node_id, new_yield, now)?;
        }

        // Step 5: log.
        store.create_harvest_log(tx, node_id, player_id, total, node.current_yield, new_yield, now)?;

        // Step 8: build result.
        let node_state = NodeState {
            current_yield: new_yield,
            is_active: respawn_timer.is_none(),
            respawn_timer,
            last_harvest: now,
        };
        let harvest_details = HarvestDetails {
            base_yield: BASE_YIELD,
            stat_bonus,
            tool_bonus,
            total_yield: total,
            bonus_rolls: 0,
            luck_factor: 1.0,
        };
        let primary_loot = vec![LootItem {
            item_type: node.node_type,
            item_subtype: node.node_subtype,
            quantity: total,
            quality: 1.0,
            source: LootSource::Primary,
        }];
        let result = HarvestResult { success: true, primary_loot, bonus_loot: Vec::new(), node_state, harvest_details };

        Ok(Outcome::Success {
            result,
            resource_type: node.node_type,
            resource_subtype: node.node_subtype.unwrap_or(0),
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player_sink::RecordingPlayerSink;
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

    #[tokio::test(flavor = "multi_thread")]
    async fn successful_harvest_reduces_yield_and_logs_inventory() {
        let (store, _file) = setup();
        let coord = strata_primitives::ChunkCoord::new(0, 0);
        {
            let conn = store.conn().unwrap();
            store.ensure_chunk(&conn, coord, Utc::now()).unwrap();
        }
        let node = {
            let conn = store.conn().unwrap();
            store
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
                .unwrap()
        };

        let sink = Arc::new(RecordingPlayerSink::default());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let engine = HarvestEngine::new(store.clone(), sink.clone(), clock);

        let result = engine.harvest(PlayerId(1), node.node_id).await.unwrap();
        assert!(result.success);
        assert_eq!(result.node_state.current_yield, 9);
        assert_eq!(result.primary_loot[0].quantity, 1);
        assert_eq!(sink.inventory_calls.lock().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_harvest_same_day_is_rejected() {
        let (store, _file) = setup();
        let coord = strata_primitives::ChunkCoord::new(0, 0);
        let node = {
            let conn = store.conn().unwrap();
            store.ensure_chunk(&conn, coord, Utc::now()).unwrap();
            store
                .create_node(
                    &conn,
                    NewNode {
                        chunk: coord,
                        local: LocalPos::new(1, 1),
                        node_type: 1,
                        node_subtype: None,
                        max_yield: 10,
                        regeneration_rate: 0,
                        spawn_type: 0,
                        spawned_at: Utc::now(),
                    },
                    10,
                )
                .unwrap()
        };

        let sink = Arc::new(RecordingPlayerSink::default());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let engine = HarvestEngine::new(store.clone(), sink, clock);

        engine.harvest(PlayerId(1), node.node_id).await.unwrap();
        let second = engine.harvest(PlayerId(1), node.node_id).await;
        assert!(matches!(second, Err(EngineError::Harvest(HarvestError::AlreadyHarvestedToday))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn depleting_last_yield_deactivates_and_schedules_respawn() {
        let (store, _file) = setup();
        let coord = strata_primitives::ChunkCoord::new(0, 0);
        let node = {
            let conn = store.conn().unwrap();
            store.ensure_chunk(&conn, coord, Utc::now()).unwrap();
            let n = store
                .create_node(
                    &conn,
                    NewNode {
                        chunk: coord,
                        local: LocalPos::new(2, 2),
                        node_type: 1,
                        node_subtype: None,
                        max_yield: 5,
                        regeneration_rate: 0,
                        spawn_type: 0,
                        spawned_at: Utc::now(),
                    },
                    1,
                )
                .unwrap();
            store.update_node_yield(&conn, n.node_id, 1).unwrap();
            n
        };

        let sink = Arc::new(RecordingPlayerSink::default());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let engine = HarvestEngine::new(store.clone(), sink, clock);

        let result = engine.harvest(PlayerId(1), node.node_id).await.unwrap();
        assert_eq!(result.node_state.current_yield, 0);
        assert!(!result.node_state.is_active);
        assert!(result.node_state.respawn_timer.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn harvest_on_missing_node_is_not_found() {
        let (store, _file) = setup();
        let sink = Arc::new(RecordingPlayerSink::default());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let engine = HarvestEngine::new(store, sink, clock);

        let result = engine.harvest(PlayerId(1), NodeId(999_999)).await;
        assert!(matches!(result, Err(EngineError::Harvest(HarvestError::NodeNotFound))));
    }
}
