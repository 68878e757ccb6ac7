//! Shared application state wired up once at startup (spec §2, §5 "Shared
//! resources").

use std::sync::Arc;
use strata_engine::{ChunkService, HarvestEngine, NoiseField, PlayerSink};
use strata_primitives::Clock;
use strata_store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub chunk_service: Arc<ChunkService>,
    pub harvest_engine: Arc<HarvestEngine>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(store: Store, clock: Arc<dyn Clock>, world_seed: u64, player_sink: Arc<dyn PlayerSink>) -> Self {
        let noise = NoiseField::new(world_seed);
        let chunk_service = Arc::new(ChunkService::new(store.clone(), noise, clock.clone(), world_seed));
        let harvest_engine = Arc::new(HarvestEngine::new(store.clone(), player_sink, clock.clone()));
        Self { store, chunk_service, harvest_engine, clock }
    }
}
