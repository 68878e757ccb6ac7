//! Player identity, inventory, stats and sessions (spec §3).

use crate::ids::PlayerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub email: Option<String>,
    pub world_x: f64,
    pub world_y: f64,
    pub world_z: f64,
    pub current_chunk_x: i64,
    pub current_chunk_z: i64,
    pub is_online: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// spec §3: `username` matches `[A-Za-z0-9_]{3,32}`.
pub fn is_valid_username(username: &str) -> bool {
    let len_ok = (3..=32).contains(&username.len());
    len_ok && username.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryKey {
    pub player_id: PlayerId,
    pub resource_type: i32,
    pub resource_subtype: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub player_id: PlayerId,
    pub resource_type: i32,
    pub resource_subtype: i32,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatLine {
    pub resource_type: i32,
    pub total_harvested: i64,
    pub harvest_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: Option<PlayerId>,
    pub per_resource: Vec<ResourceStatLine>,
    pub total_harvests: i64,
    pub total_resources_harvested: i64,
    pub nodes_depleted: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_token: String,
    pub player_id: PlayerId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_validation_matches_spec_regex() {
        assert!(is_valid_username("abc"));
        assert!(is_valid_username("Player_123"));
        assert!(!is_valid_username("ab")); // too short
        assert!(!is_valid_username(&"a".repeat(33))); // too long
        assert!(!is_valid_username("bad name")); // space
        assert!(!is_valid_username("bad-name")); // dash
    }
}
