//! Schema versioning.
//!
//! Each migration runs in its own transaction together with its row in
//! `_migrations`, so a failed step leaves the previous version intact.

use rusqlite::{params, Connection};

use super::error::DatabaseError;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_jobs",
    sql: include_str!("sql/001_create_jobs.sql"),
}];

/// Highest schema version this build knows how to use.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

fn applied_version(conn: &Connection) -> Result<u32, DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

/// Brings the schema up to [`latest_version`] and returns it.
///
/// A database written by a newer build is refused rather than read with a
/// schema this build does not understand.
pub fn migrate(conn: &mut Connection) -> Result<u32, DatabaseError> {
    let applied = applied_version(conn)?;
    let supported = latest_version();
    if applied > supported {
        return Err(DatabaseError::UnsupportedSchema {
            found: applied,
            supported,
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        let failed = |source| DatabaseError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        };

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )
        .map_err(failed)?;
        tx.commit()?;

        log::info!("Applied schema migration {} ({})", migration.version, migration.name);
    }

    Ok(supported)
}
