//! The harvest engine's only dependency on the player module: a two-method
//! capability injected at construction, not a hard dependency on a concrete
//! store (spec §9 "Dynamic interface for PlayerSink").

use async_trait::async_trait;
use strata_primitives::{PlayerId, StorageError};

#[derive(Debug, Clone, Copy)]
pub struct HarvestStatsUpdate {
    pub resource_type: i32,
    pub amount_harvested: i64,
}

#[async_trait]
pub trait PlayerSink: Send + Sync {
    async fn add_to_inventory(
        &self,
        player_id: PlayerId,
        resource_type: i32,
        resource_subtype: i32,
        amount: i64,
    ) -> Result<(), StorageError>;

    async fn update_harvest_stats(
        &self,
        player_id: PlayerId,
        update: HarvestStatsUpdate,
    ) -> Result<(), StorageError>;
}

/// Production sink backed by the real store (spec §9: "a real store-backed
/// sink in production").
pub struct StorePlayerSink {
    store: strata_store::Store,
}

impl StorePlayerSink {
    pub fn new(store: strata_store::Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PlayerSink for StorePlayerSink {
    async fn add_to_inventory(
        &self,
        player_id: PlayerId,
        resource_type: i32,
        resource_subtype: i32,
        amount: i64,
    ) -> Result<(), StorageError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            store.add_to_inventory(&conn, player_id, resource_type, resource_subtype, amount, chrono::Utc::now())
        })
        .await
        .map_err(|e| StorageError::backend(e.to_string()))?
    }

    async fn update_harvest_stats(
        &self,
        player_id: PlayerId,
        update: HarvestStatsUpdate,
    ) -> Result<(), StorageError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            store.update_harvest_stats(&conn, player_id, update.resource_type, update.amount_harvested)
        })
        .await
        .map_err(|e| StorageError::backend(e.to_string()))?
    }
}

/// In-memory recorder for tests (spec §9: "an in-memory recorder in
/// tests").
#[derive(Default)]
pub struct RecordingPlayerSink {
    pub inventory_calls: parking_lot::Mutex<Vec<(PlayerId, i32, i32, i64)>>,
    pub stats_calls: parking_lot::Mutex<Vec<(PlayerId, HarvestStatsUpdate)>>,
}

#[async_trait]
impl PlayerSink for RecordingPlayerSink {
    async fn add_to_inventory(
        &self,
        player_id: PlayerId,
        resource_type: i32,
        resource_subtype: i32,
        amount: i64,
    ) -> Result<(), StorageError> {
        self.inventory_calls.lock().push((player_id, resource_type, resource_subtype, amount));
        Ok(())
    }

    async fn update_harvest_stats(
        &self,
        player_id: PlayerId,
        update: HarvestStatsUpdate,
    ) -> Result<(), StorageError> {
        self.stats_calls.lock().push((player_id, update));
        Ok(())
    }
}
