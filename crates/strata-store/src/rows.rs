//! Row <-> domain type mapping. Kept separate from `store.rs` so the SQL
//! surface and the decode logic can be read independently.

use chrono::{DateTime, Utc};
use rusqlite::{Error as SqlError, Row};
use strata_primitives::{
    ChunkCoord, HarvestLogEntry, HarvestLogId, InventoryEntry, LocalPos, NodeId, Player, PlayerId,
    ResourceNode, Session, SpawnTemplate, TemplateId,
};

pub fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

pub fn fmt_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub fn node_from_row(row: &Row) -> Result<ResourceNode, SqlError> {
    let spawn_type: i64 = row.get("spawn_type")?;
    Ok(ResourceNode {
        node_id: NodeId(row.get("node_id")?),
        chunk: ChunkCoord::new(row.get("chunk_x")?, row.get("chunk_z")?),
        local: LocalPos::new(row.get("local_x")?, row.get("local_z")?),
        node_type: row.get("node_type")?,
        node_subtype: row.get("node_subtype")?,
        max_yield: row.get("max_yield")?,
        current_yield: row.get("current_yield")?,
        regeneration_rate: row.get("regeneration_rate")?,
        spawned_at: parse_dt(&row.get::<_, String>("spawned_at")?),
        last_harvest: row.get::<_, Option<String>>("last_harvest")?.as_deref().map(parse_dt),
        respawn_timer: row.get::<_, Option<String>>("respawn_timer")?.as_deref().map(parse_dt),
        spawn_type: spawn_type as u8,
        is_active: row.get::<_, i64>("is_active")? != 0,
    })
}

pub fn template_from_row(row: &Row) -> Result<SpawnTemplate, SqlError> {
    Ok(SpawnTemplate {
        template_id: TemplateId(row.get("template_id")?),
        node_type: row.get("node_type")?,
        node_subtype: row.get("node_subtype")?,
        min_yield: row.get("min_yield")?,
        max_yield: row.get("max_yield")?,
        regeneration_rate: row.get("regeneration_rate")?,
        respawn_delay_hours: row.get("respawn_delay_hours")?,
        spawn_weight: row.get("spawn_weight")?,
        cluster_size_min: row.get("cluster_size_min")?,
        cluster_size_max: row.get("cluster_size_max")?,
        cluster_spread_min: row.get("cluster_spread_min")?,
        cluster_spread_max: row.get("cluster_spread_max")?,
        clusters_per_chunk: row.get("clusters_per_chunk")?,
        noise_scale: row.get("noise_scale")?,
        noise_threshold: row.get("noise_threshold")?,
    })
}

pub fn harvest_log_from_row(row: &Row) -> Result<HarvestLogEntry, SqlError> {
    Ok(HarvestLogEntry {
        log_id: HarvestLogId(row.get("log_id")?),
        node_id: NodeId(row.get("node_id")?),
        player_id: PlayerId(row.get("player_id")?),
        amount_harvested: row.get("amount_harvested")?,
        node_yield_before: row.get("node_yield_before")?,
        node_yield_after: row.get("node_yield_after")?,
        harvested_at: parse_dt(&row.get::<_, String>("harvested_at")?),
    })
}

pub fn player_from_row(row: &Row) -> Result<Player, SqlError> {
    Ok(Player {
        player_id: PlayerId(row.get("player_id")?),
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        salt: row.get("salt")?,
        email: row.get("email")?,
        world_x: row.get("world_x")?,
        world_y: row.get("world_y")?,
        world_z: row.get("world_z")?,
        current_chunk_x: row.get("current_chunk_x")?,
        current_chunk_z: row.get("current_chunk_z")?,
        is_online: row.get::<_, i64>("is_online")? != 0,
        created_at: parse_dt(&row.get::<_, String>("created_at")?),
        updated_at: parse_dt(&row.get::<_, String>("updated_at")?),
    })
}

pub fn inventory_from_row(row: &Row) -> Result<InventoryEntry, SqlError> {
    Ok(InventoryEntry {
        player_id: PlayerId(row.get("player_id")?),
        resource_type: row.get("resource_type")?,
        resource_subtype: row.get("resource_subtype")?,
        quantity: row.get("quantity")?,
        created_at: parse_dt(&row.get::<_, String>("created_at")?),
        updated_at: parse_dt(&row.get::<_, String>("updated_at")?),
    })
}

pub fn session_from_row(row: &Row) -> Result<Session, SqlError> {
    Ok(Session {
        session_token: row.get("session_token")?,
        player_id: PlayerId(row.get("player_id")?),
        created_at: parse_dt(&row.get::<_, String>("created_at")?),
        expires_at: parse_dt(&row.get::<_, String>("expires_at")?),
        last_activity: parse_dt(&row.get::<_, String>("last_activity")?),
        ip_address: row.get("ip_address")?,
        user_agent: row.get("user_agent")?,
    })
}
