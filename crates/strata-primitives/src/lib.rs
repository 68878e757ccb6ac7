//! Shared domain types for the world-state harvest engine: identifiers,
//! nodes, templates, players, harvest results, error kinds, and the clock
//! abstraction. No storage backend or HTTP framework dependency lives here;
//! this crate is the vocabulary every other crate in the workspace shares.

pub mod errors;
pub mod harvest;
pub mod ids;
pub mod node;
pub mod player;
pub mod time;

pub use errors::{AuthError, EngineError, HarvestError, RegistrationError, StorageError};
pub use harvest::{HarvestDetails, HarvestLogEntry, HarvestResult, LootItem, LootSource, NodeState};
pub use ids::{ChunkCoord, HarvestLogId, LocalPos, NodeId, PlayerId, TemplateId, CHUNK_SIZE};
pub use node::{ResourceNode, ResourceType, SpawnTemplate};
pub use player::{InventoryEntry, InventoryKey, Player, PlayerStats, ResourceStatLine, Session};
pub use time::{Clock, FakeClock, SystemClock};
