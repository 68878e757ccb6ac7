//! Harvest transaction outputs and log rows (spec §3, §4.6).

use crate::ids::{HarvestLogId, NodeId, PlayerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestLogEntry {
    pub log_id: HarvestLogId,
    pub node_id: NodeId,
    pub player_id: PlayerId,
    pub amount_harvested: i32,
    pub node_yield_before: i32,
    pub node_yield_after: i32,
    pub harvested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LootSource {
    #[serde(rename = "primary")]
    Primary,
    #[serde(rename = "bonus")]
    Bonus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootItem {
    pub item_type: i32,
    pub item_subtype: Option<i32>,
    pub quantity: i32,
    pub quality: f64,
    pub source: LootSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub current_yield: i32,
    pub is_active: bool,
    pub respawn_timer: Option<DateTime<Utc>>,
    pub last_harvest: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarvestDetails {
    pub base_yield: i32,
    pub stat_bonus: i32,
    pub tool_bonus: i32,
    pub total_yield: i32,
    pub bonus_rolls: i32,
    pub luck_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestResult {
    pub success: bool,
    pub primary_loot: Vec<LootItem>,
    pub bonus_loot: Vec<LootItem>,
    pub node_state: NodeState,
    pub harvest_details: HarvestDetails,
}
