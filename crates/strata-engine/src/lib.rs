//! The world and harvest engine: chunk materialization, noise- and
//! cluster-driven node generation, the node lifecycle, the harvest
//! transaction, and the background regeneration/cleanup loops.

pub mod cache;
pub mod chunk_service;
pub mod generator;
pub mod harvest;
pub mod lifecycle;
pub mod metrics;
pub mod noise;
pub mod player_sink;
pub mod scheduler;
pub mod world_seed;

pub use cache::OccupiedPositionCache;
pub use chunk_service::{ChunkResponse, ChunkService};
pub use generator::Generator;
pub use harvest::HarvestEngine;
pub use lifecycle::LifecycleManager;
pub use noise::{spawn_type_hash, NoiseField};
pub use player_sink::{HarvestStatsUpdate, PlayerSink, RecordingPlayerSink, StorePlayerSink};
pub use scheduler::Scheduler;
pub use world_seed::load_or_init_world_seed;
