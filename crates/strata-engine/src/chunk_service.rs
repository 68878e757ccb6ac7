//! The public read path: ensure chunk, generate, respawn, read (spec §4.7).

use crate::cache::OccupiedPositionCache;
use crate::generator::Generator;
use crate::lifecycle::LifecycleManager;
use crate::noise::NoiseField;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use strata_primitives::{ChunkCoord, Clock, ResourceNode, StorageError};
use strata_store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct ChunkResponse {
    pub chunk_x: i64,
    pub chunk_z: i64,
    pub nodes: Vec<ResourceNode>,
}

/// A striped mutex keyed by chunk coordinate (spec §5 "Chunk lock"). Held for
/// the duration of ensure/generate/respawn/read so concurrent `getChunk`
/// calls for the same coordinate never race the generator.
#[derive(Default)]
struct ChunkLocks {
    locks: Mutex<HashMap<ChunkCoord, Arc<Mutex<()>>>>,
}

impl ChunkLocks {
    fn lock_for(&self, coord: ChunkCoord) -> Arc<Mutex<()>> {
        self.locks.lock().entry(coord).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}

pub struct ChunkService {
    store: Store,
    noise: NoiseField,
    cache: OccupiedPositionCache,
    clock: Arc<dyn Clock>,
    world_seed: u64,
    chunk_locks: ChunkLocks,
}

impl ChunkService {
    pub fn new(store: Store, noise: NoiseField, clock: Arc<dyn Clock>, world_seed: u64) -> Self {
        Self { store, noise, cache: OccupiedPositionCache::new(), clock, world_seed, chunk_locks: ChunkLocks::default() }
    }

    /// `getChunk(chunkX, chunkZ) -> ChunkResponse` (spec §4.7).
    pub async fn get_chunk(&self, chunk_x: i64, chunk_z: i64) -> Result<ChunkResponse, StorageError> {
        let coord = ChunkCoord::new(chunk_x, chunk_z);
        let lock = self.chunk_locks.lock_for(coord);
        let store = self.store.clone();
        let noise = self.noise.clone();
        let cache = self.cache.clone();
        let clock = self.clock.clone();
        let world_seed = self.world_seed;

        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            let conn = store.conn()?;
            store.ensure_chunk(&conn, coord, clock.now())?;

            let generator = Generator::new(&store, &noise, &cache);
            generator.generate(&conn, coord, clock.as_ref(), world_seed)?;

            let lifecycle = LifecycleManager::new(&store);
            lifecycle.respawn_sweep(&conn, coord, clock.as_ref())?;

            let nodes = store.get_chunk_active_nodes(&conn, coord)?;
            crate::metrics::CHUNKS_MATERIALIZED.inc();
            Ok(ChunkResponse { chunk_x, chunk_z, nodes })
        })
        .await
        .map_err(|e| StorageError::backend(e.to_string()))?
    }
}
