//! Ordered, numbered migration files applied at startup (spec §6 "Schema
//! evolves via ordered, numbered migration files applied at startup").

use rusqlite::Connection;
use strata_primitives::StorageError;
use tracing::info;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "init",
    sql: include_str!("migrations/0001_init.sql"),
}];

/// Applies every migration newer than the database's current version, each
/// inside its own transaction, recording progress in `schema_migrations` so
/// a restart resumes from where it left off.
pub fn run_migrations(conn: &mut Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            applied_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )
    .map_err(|e| StorageError::backend(e.to_string()))?;

    let current: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .map_err(|e| StorageError::backend(e.to_string()))?;

    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        let tx = conn.transaction().map_err(|e| StorageError::backend(e.to_string()))?;
        tx.execute_batch(migration.sql).map_err(|e| StorageError::backend(e.to_string()))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.name],
        )
        .map_err(|e| StorageError::backend(e.to_string()))?;
        tx.commit().map_err(|e| StorageError::backend(e.to_string()))?;
        info!(version = migration.version, name = migration.name, "applied migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_cleanly_on_fresh_db_and_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap(); // second call is a no-op

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
