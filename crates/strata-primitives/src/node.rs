//! Spawn templates and resource nodes (spec §3, §4.2, §4.4).

use crate::ids::{ChunkCoord, LocalPos, NodeId, TemplateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource type identifiers. The noise field is keyed on this (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ResourceType {
    IronOre = 1,
    GoldOre = 2,
    Wood = 3,
    Stone = 4,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] =
        [ResourceType::IronOre, ResourceType::GoldOre, ResourceType::Wood, ResourceType::Stone];

    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            1 => Some(Self::IronOre),
            2 => Some(Self::GoldOre),
            3 => Some(Self::Wood),
            4 => Some(Self::Stone),
            _ => None,
        }
    }
}

/// Governs when, where, and how nodes of a type are generated (spec §3, §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnTemplate {
    pub template_id: TemplateId,
    pub node_type: i32,
    pub node_subtype: Option<i32>,
    pub min_yield: i32,
    pub max_yield: i32,
    pub regeneration_rate: i32,
    pub respawn_delay_hours: i64,
    pub spawn_weight: f64,
    pub cluster_size_min: i32,
    pub cluster_size_max: i32,
    pub cluster_spread_min: f64,
    pub cluster_spread_max: f64,
    pub clusters_per_chunk: i32,
    pub noise_scale: f64,
    pub noise_threshold: f64,
}

impl SpawnTemplate {
    pub const DEFAULT_RESPAWN_DELAY_HOURS: i64 = 24;
    pub const DEFAULT_NOISE_SCALE: f64 = 0.1;
    pub const DEFAULT_NOISE_THRESHOLD: f64 = 0.5;

    /// spec §4.4: "if `T.clusterSizeMax > 1` or `T.clusterSpreadMax > 0`,
    /// place nodes as clusters, otherwise as single points".
    pub fn uses_clusters(&self) -> bool {
        self.cluster_size_max > 1 || self.cluster_spread_max > 0.0
    }
}

/// A harvestable resource instance occupying one cell (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub node_id: NodeId,
    pub chunk: ChunkCoord,
    pub local: LocalPos,
    pub node_type: i32,
    pub node_subtype: Option<i32>,
    pub max_yield: i32,
    pub current_yield: i32,
    pub regeneration_rate: i32,
    pub spawned_at: DateTime<Utc>,
    pub last_harvest: Option<DateTime<Utc>>,
    pub respawn_timer: Option<DateTime<Utc>>,
    /// Observational only; spec §4.2/§9 — never branched on for harvest
    /// semantics.
    pub spawn_type: u8,
    pub is_active: bool,
}

impl ResourceNode {
    /// spec §3 invariant: `0 ≤ currentYield ≤ maxYield`.
    pub fn yield_in_range(&self) -> bool {
        self.current_yield >= 0 && self.current_yield <= self.max_yield
    }

    /// spec §3 invariant: `isActive ⇒ currentYield > 0`.
    pub fn active_invariant_holds(&self) -> bool {
        !self.is_active || self.current_yield > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_detection_matches_spec_rule() {
        let base = SpawnTemplate {
            template_id: TemplateId(1),
            node_type: 1,
            node_subtype: None,
            min_yield: 1,
            max_yield: 1,
            regeneration_rate: 0,
            respawn_delay_hours: 24,
            spawn_weight: 1.0,
            cluster_size_min: 1,
            cluster_size_max: 1,
            cluster_spread_min: 0.0,
            cluster_spread_max: 0.0,
            clusters_per_chunk: 1,
            noise_scale: 0.1,
            noise_threshold: 0.5,
        };
        assert!(!base.uses_clusters());

        let mut clustered = base.clone();
        clustered.cluster_size_max = 3;
        assert!(clustered.uses_clusters());

        let mut spread = base;
        spread.cluster_spread_max = 2.5;
        assert!(spread.uses_clusters());
    }
}
