//! Typed store operations (spec §4.1). Every operation here is a thin,
//! parameter-bound SQL statement; none concatenates user values into a
//! query string. Each fn takes `&Connection` so callers choose whether it
//! runs inside an ambient transaction (`Transaction` derefs to `Connection`)
//! or on a fresh pooled connection for a one-shot read.

use crate::pool::{Pool, PooledConnection};
use crate::rows::{
    fmt_dt, harvest_log_from_row, inventory_from_row, node_from_row, player_from_row,
    session_from_row, template_from_row,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::HashSet;
use strata_primitives::{
    ChunkCoord, HarvestLogEntry, InventoryEntry, LocalPos, NodeId, Player, PlayerId, PlayerStats,
    ResourceNode, ResourceStatLine, Session, SpawnTemplate, StorageError, TemplateId,
};

fn sql_err(e: rusqlite::Error) -> StorageError {
    StorageError::backend(e.to_string())
}

/// Parameters for creating a new resource node (spec §4.4 "Node creation").
#[derive(Debug, Clone)]
pub struct NewNode {
    pub chunk: ChunkCoord,
    pub local: LocalPos,
    pub node_type: i32,
    pub node_subtype: Option<i32>,
    pub max_yield: i32,
    pub regeneration_rate: i32,
    pub spawn_type: u8,
    pub spawned_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RegisterPlayer {
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    pub email: Option<String>,
}

/// Persistence façade over a single SQLite file. Owns all durable state and
/// a pool of connections; exposes typed operations plus a transactional
/// scope (spec §2 "Store", §4.1).
#[derive(Clone)]
pub struct Store {
    pool: Pool,
}

impl Store {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn conn(&self) -> Result<PooledConnection, StorageError> {
        self.pool.get().map_err(|e| StorageError::backend(e.to_string()))
    }

    /// Runs `f` inside a single SQLite transaction on a freshly checked-out
    /// connection, committing on `Ok` and rolling back (automatically, via
    /// `Transaction`'s `Drop`) on `Err` (spec §4.6 "all steps inside a
    /// single transaction").
    pub fn with_transaction<F, R>(&self, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(&Transaction) -> Result<R, StorageError>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(sql_err)?;
        let result = f(&tx)?;
        tx.commit().map_err(sql_err)?;
        Ok(result)
    }

    // ---- World config -------------------------------------------------

    pub fn get_world_config(&self, conn: &Connection, key: &str) -> Result<Option<String>, StorageError> {
        conn.query_row(
            "SELECT config_value FROM world_config WHERE config_key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_err)
    }

    pub fn set_world_config(&self, conn: &Connection, key: &str, value: &str) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO world_config (config_key, config_value) VALUES (?1, ?2)
             ON CONFLICT(config_key) DO UPDATE SET config_value = excluded.config_value",
            params![key, value],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    // ---- Chunks ---------------------------------------------------------

    /// Idempotent chunk creation (spec §3 "Created idempotently on first
    /// access").
    pub fn ensure_chunk(&self, conn: &Connection, coord: ChunkCoord, now: DateTime<Utc>) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO chunks (chunk_x, chunk_z, created_at, last_modified)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(chunk_x, chunk_z) DO NOTHING",
            params![coord.x, coord.z, fmt_dt(now)],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    pub fn touch_chunk(&self, conn: &Connection, coord: ChunkCoord, at: DateTime<Utc>) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE chunks SET last_modified = ?3 WHERE chunk_x = ?1 AND chunk_z = ?2",
            params![coord.x, coord.z, fmt_dt(at)],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    // ---- Spawn templates -------------------------------------------------

    pub fn get_all_spawn_templates(&self, conn: &Connection) -> Result<Vec<SpawnTemplate>, StorageError> {
        let mut stmt = conn
            .prepare("SELECT * FROM spawn_templates")
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], template_from_row)
            .map_err(sql_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(rows)
    }

    pub fn get_respawn_delay_hours(
        &self,
        conn: &Connection,
        node_type: i32,
        node_subtype: Option<i32>,
    ) -> Result<i64, StorageError> {
        let hours: Option<i64> = conn
            .query_row(
                "SELECT respawn_delay_hours FROM spawn_templates
                 WHERE node_type = ?1 AND node_subtype IS ?2
                 LIMIT 1",
                params![node_type, node_subtype],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err)?;
        Ok(hours.unwrap_or(strata_primitives::SpawnTemplate::DEFAULT_RESPAWN_DELAY_HOURS))
    }

    // ---- Resource nodes ---------------------------------------------------

    pub fn get_chunk_occupied_positions(
        &self,
        conn: &Connection,
        coord: ChunkCoord,
    ) -> Result<HashSet<i32>, StorageError> {
        let mut stmt = conn
            .prepare(
                "SELECT local_x, local_z FROM resource_nodes
                 WHERE chunk_x = ?1 AND chunk_z = ?2 AND is_active = 1",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map(params![coord.x, coord.z], |row| {
                let x: i32 = row.get(0)?;
                let z: i32 = row.get(1)?;
                Ok(LocalPos::new(x, z).cache_key())
            })
            .map_err(sql_err)?
            .collect::<Result<HashSet<_>, _>>()
            .map_err(sql_err)?;
        Ok(rows)
    }

    pub fn get_chunk_node_count(
        &self,
        conn: &Connection,
        coord: ChunkCoord,
        node_type: i32,
        node_subtype: Option<i32>,
    ) -> Result<i32, StorageError> {
        conn.query_row(
            "SELECT COUNT(*) FROM resource_nodes
             WHERE chunk_x = ?1 AND chunk_z = ?2 AND node_type = ?3 AND node_subtype IS ?4",
            params![coord.x, coord.z, node_type, node_subtype],
            |row| row.get(0),
        )
        .map_err(sql_err)
    }

    /// Creates a node. The partial unique index on active cells
    /// (`idx_resource_nodes_active_cell`) is the backstop that turns a
    /// racing double-spawn at the same cell into a constraint violation
    /// rather than silent duplication (spec §5 "uniqueness index... for
    /// active nodes prevents duplicate spawns").
    pub fn create_node(&self, conn: &Connection, new: NewNode, current_yield: i32) -> Result<ResourceNode, StorageError> {
        conn.execute(
            "INSERT INTO resource_nodes
             (chunk_x, chunk_z, local_x, local_z, node_type, node_subtype,
              max_yield, current_yield, regeneration_rate, spawned_at,
              last_harvest, respawn_timer, spawn_type, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, NULL, ?11, 1)",
            params![
                new.chunk.x,
                new.chunk.z,
                new.local.x,
                new.local.z,
                new.node_type,
                new.node_subtype,
                new.max_yield,
                current_yield,
                new.regeneration_rate,
                fmt_dt(new.spawned_at),
                new.spawn_type as i64,
            ],
        )
        .map_err(sql_err)?;
        let node_id = conn.last_insert_rowid();
        self.get_node(conn, NodeId(node_id))?
            .ok_or_else(|| StorageError::backend("node vanished immediately after insert"))
    }

    pub fn get_node(&self, conn: &Connection, node_id: NodeId) -> Result<Option<ResourceNode>, StorageError> {
        conn.query_row(
            "SELECT * FROM resource_nodes WHERE node_id = ?1",
            params![node_id.0],
            node_from_row,
        )
        .optional()
        .map_err(sql_err)
    }

    pub fn get_chunk_active_nodes(&self, conn: &Connection, coord: ChunkCoord) -> Result<Vec<ResourceNode>, StorageError> {
        let mut stmt = conn
            .prepare(
                "SELECT * FROM resource_nodes
                 WHERE chunk_x = ?1 AND chunk_z = ?2 AND is_active = 1",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map(params![coord.x, coord.z], node_from_row)
            .map_err(sql_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(rows)
    }

    pub fn update_node_yield(&self, conn: &Connection, node_id: NodeId, new_yield: i32) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE resource_nodes SET current_yield = ?2 WHERE node_id = ?1",
            params![node_id.0, new_yield],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    /// spec §3 "Lifecycle": drain to zero, deactivate, schedule respawn.
    pub fn deactivate_node(
        &self,
        conn: &Connection,
        node_id: NodeId,
        respawn_timer: DateTime<Utc>,
        last_harvest: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE resource_nodes
             SET current_yield = 0, is_active = 0, respawn_timer = ?2, last_harvest = ?3
             WHERE node_id = ?1",
            params![node_id.0, fmt_dt(respawn_timer), fmt_dt(last_harvest)],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    pub fn record_harvest_yield(
        &self,
        conn: &Connection,
        node_id: NodeId,
        new_yield: i32,
        harvested_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE resource_nodes SET current_yield = ?2, last_harvest = ?3 WHERE node_id = ?1",
            params![node_id.0, new_yield, fmt_dt(harvested_at)],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    /// spec §4.5 "Respawn sweep": select + reactivate every node in the
    /// chunk whose timer has elapsed.
    pub fn get_nodes_to_respawn(
        &self,
        conn: &Connection,
        coord: ChunkCoord,
        now: DateTime<Utc>,
    ) -> Result<Vec<NodeId>, StorageError> {
        let mut stmt = conn
            .prepare(
                "SELECT node_id FROM resource_nodes
                 WHERE chunk_x = ?1 AND chunk_z = ?2
                   AND is_active = 0 AND respawn_timer IS NOT NULL AND respawn_timer <= ?3",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map(params![coord.x, coord.z, fmt_dt(now)], |row| Ok(NodeId(row.get(0)?)))
            .map_err(sql_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(rows)
    }

    pub fn reactivate_node(&self, conn: &Connection, node_id: NodeId, max_yield: i32) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE resource_nodes
             SET current_yield = ?2, is_active = 1, respawn_timer = NULL
             WHERE node_id = ?1",
            params![node_id.0, max_yield],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    /// spec §4.5 "Global regeneration": a single set-based update across
    /// every active, non-full node. Returns the number of rows touched.
    pub fn regenerate_yield_on_all_active_nodes(&self, conn: &Connection) -> Result<usize, StorageError> {
        conn.execute(
            "UPDATE resource_nodes
             SET current_yield = MIN(max_yield, current_yield + regeneration_rate)
             WHERE is_active = 1 AND current_yield < max_yield AND regeneration_rate > 0",
            [],
        )
        .map_err(sql_err)
    }

    // ---- Harvest log ------------------------------------------------------

    pub fn create_harvest_log(
        &self,
        conn: &Connection,
        node_id: NodeId,
        player_id: PlayerId,
        amount_harvested: i32,
        node_yield_before: i32,
        node_yield_after: i32,
        harvested_at: DateTime<Utc>,
    ) -> Result<HarvestLogEntry, StorageError> {
        let day = harvested_at.date_naive();
        conn.execute(
            "INSERT INTO harvest_log
             (node_id, player_id, amount_harvested, node_yield_before, node_yield_after,
              harvested_at, harvested_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                node_id.0,
                player_id.0,
                amount_harvested,
                node_yield_before,
                node_yield_after,
                fmt_dt(harvested_at),
                day.to_string(),
            ],
        )
        .map_err(sql_err)?;
        let log_id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT * FROM harvest_log WHERE log_id = ?1",
            params![log_id],
            harvest_log_from_row,
        )
        .map_err(sql_err)
    }

    /// spec §4.6 step 1 "Daily-limit gate": count rows for
    /// `(playerId, nodeId)` where `date(harvestedAt) = date(now)`. UTC per
    /// spec §9 ("implementations should use UTC for reproducibility").
    pub fn get_player_daily_harvest_count(
        &self,
        conn: &Connection,
        player_id: PlayerId,
        node_id: NodeId,
        day: NaiveDate,
    ) -> Result<i64, StorageError> {
        conn.query_row(
            "SELECT COUNT(*) FROM harvest_log
             WHERE player_id = ?1 AND node_id = ?2 AND harvested_date = ?3",
            params![player_id.0, node_id.0, day.to_string()],
            |row| row.get(0),
        )
        .map_err(sql_err)
    }

    // ---- Players ------------------------------------------------------

    pub fn create_player(&self, conn: &Connection, new: RegisterPlayer, now: DateTime<Utc>) -> Result<Player, StorageError> {
        conn.execute(
            "INSERT INTO players
             (username, password_hash, salt, email, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![new.username, new.password_hash, new.salt, new.email, fmt_dt(now)],
        )
        .map_err(sql_err)?;
        let player_id = conn.last_insert_rowid();
        self.get_player_by_id(conn, PlayerId(player_id))?
            .ok_or_else(|| StorageError::backend("player vanished immediately after insert"))
    }

    pub fn get_player_by_id(&self, conn: &Connection, player_id: PlayerId) -> Result<Option<Player>, StorageError> {
        conn.query_row(
            "SELECT * FROM players WHERE player_id = ?1",
            params![player_id.0],
            player_from_row,
        )
        .optional()
        .map_err(sql_err)
    }

    pub fn get_player_by_username(&self, conn: &Connection, username: &str) -> Result<Option<Player>, StorageError> {
        conn.query_row(
            "SELECT * FROM players WHERE username = ?1",
            params![username],
            player_from_row,
        )
        .optional()
        .map_err(sql_err)
    }

    pub fn username_exists(&self, conn: &Connection, username: &str) -> Result<bool, StorageError> {
        Ok(self.get_player_by_username(conn, username)?.is_some())
    }

    pub fn email_exists(&self, conn: &Connection, email: &str) -> Result<bool, StorageError> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM players WHERE email = ?1)",
            params![email],
            |row| row.get::<_, i64>(0),
        )
        .map(|v| v != 0)
        .map_err(sql_err)
    }

    pub fn set_player_online(&self, conn: &Connection, player_id: PlayerId, online: bool, at: DateTime<Utc>) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE players SET is_online = ?2, updated_at = ?3 WHERE player_id = ?1",
            params![player_id.0, online as i64, fmt_dt(at)],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    pub fn update_player_position(
        &self,
        conn: &Connection,
        player_id: PlayerId,
        world_x: f64,
        world_y: f64,
        world_z: f64,
        chunk: ChunkCoord,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE players
             SET world_x = ?2, world_y = ?3, world_z = ?4,
                 current_chunk_x = ?5, current_chunk_z = ?6, updated_at = ?7
             WHERE player_id = ?1",
            params![player_id.0, world_x, world_y, world_z, chunk.x, chunk.z, fmt_dt(at)],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    pub fn get_online_players(&self, conn: &Connection) -> Result<Vec<Player>, StorageError> {
        let mut stmt = conn
            .prepare("SELECT * FROM players WHERE is_online = 1")
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], player_from_row)
            .map_err(sql_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(rows)
    }

    // ---- Inventory ------------------------------------------------------

    /// spec §3 "Aggregated; adding N increments quantity atomically."
    pub fn add_to_inventory(
        &self,
        conn: &Connection,
        player_id: PlayerId,
        resource_type: i32,
        resource_subtype: i32,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO player_inventory
             (player_id, resource_type, resource_subtype, quantity, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(player_id, resource_type, resource_subtype)
             DO UPDATE SET quantity = quantity + excluded.quantity, updated_at = excluded.updated_at",
            params![player_id.0, resource_type, resource_subtype, amount, fmt_dt(at)],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    pub fn get_inventory(&self, conn: &Connection, player_id: PlayerId) -> Result<Vec<InventoryEntry>, StorageError> {
        let mut stmt = conn
            .prepare(
                "SELECT * FROM player_inventory WHERE player_id = ?1 ORDER BY resource_type, resource_subtype",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map(params![player_id.0], inventory_from_row)
            .map_err(sql_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(rows)
    }

    // ---- Stats ----------------------------------------------------------

    pub fn update_harvest_stats(
        &self,
        conn: &Connection,
        player_id: PlayerId,
        resource_type: i32,
        amount_harvested: i64,
    ) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO player_stats (player_id, resource_type, total_harvested, harvest_count)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(player_id, resource_type)
             DO UPDATE SET total_harvested = total_harvested + excluded.total_harvested,
                            harvest_count = harvest_count + 1",
            params![player_id.0, resource_type, amount_harvested],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    pub fn get_player_stats(&self, conn: &Connection, player_id: PlayerId) -> Result<PlayerStats, StorageError> {
        let mut stmt = conn
            .prepare(
                "SELECT resource_type, total_harvested, harvest_count
                 FROM player_stats WHERE player_id = ?1 ORDER BY resource_type",
            )
            .map_err(sql_err)?;
        let per_resource = stmt
            .query_map(params![player_id.0], |row| {
                Ok(ResourceStatLine {
                    resource_type: row.get(0)?,
                    total_harvested: row.get(1)?,
                    harvest_count: row.get(2)?,
                })
            })
            .map_err(sql_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_err)?;

        let total_harvests = per_resource.iter().map(|r| r.harvest_count).sum();
        let total_resources_harvested = per_resource.iter().map(|r| r.total_harvested).sum();

        Ok(PlayerStats {
            player_id: Some(player_id),
            per_resource,
            total_harvests,
            total_resources_harvested,
            nodes_depleted: 0,
        })
    }

    // ---- Sessions ---------------------------------------------------------

    pub fn create_session(
        &self,
        conn: &Connection,
        token: &str,
        player_id: PlayerId,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Session, StorageError> {
        conn.execute(
            "INSERT INTO player_sessions
             (session_token, player_id, created_at, expires_at, last_activity, ip_address, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?3, ?5, ?6)",
            params![
                token,
                player_id.0,
                fmt_dt(created_at),
                fmt_dt(expires_at),
                ip_address,
                user_agent
            ],
        )
        .map_err(sql_err)?;
        conn.query_row(
            "SELECT * FROM player_sessions WHERE session_token = ?1",
            params![token],
            session_from_row,
        )
        .map_err(sql_err)
    }

    pub fn get_session(&self, conn: &Connection, token: &str) -> Result<Option<Session>, StorageError> {
        conn.query_row(
            "SELECT * FROM player_sessions WHERE session_token = ?1",
            params![token],
            session_from_row,
        )
        .optional()
        .map_err(sql_err)
    }

    pub fn touch_session(&self, conn: &Connection, token: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE player_sessions SET last_activity = ?2 WHERE session_token = ?1",
            params![token, fmt_dt(at)],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    pub fn delete_session(&self, conn: &Connection, token: &str) -> Result<(), StorageError> {
        conn.execute("DELETE FROM player_sessions WHERE session_token = ?1", params![token])
            .map_err(sql_err)?;
        Ok(())
    }

    /// spec §4.5 "Session cleanup": delete every session whose `expiresAt <
    /// now`. Returns the number of rows deleted.
    pub fn delete_expired_sessions(&self, conn: &Connection, now: DateTime<Utc>) -> Result<usize, StorageError> {
        conn.execute(
            "DELETE FROM player_sessions WHERE expires_at < ?1",
            params![fmt_dt(now)],
        )
        .map_err(sql_err)
    }
}

#[allow(dead_code)]
fn _assert_template_id_used(_: TemplateId) {}
