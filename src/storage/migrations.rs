use rusqlite::Connection;
use tracing::info;

use crate::error::{FiredashError, FiredashResult};

/// Database schema version
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Run all necessary database migrations
pub fn run_migrations(conn: &Connection) -> FiredashResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    for version in (current_version + 1)..=CURRENT_SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        update_schema_version(conn, version)?;
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> FiredashResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn update_schema_version(conn: &Connection, version: i32) -> FiredashResult<()> {
    conn.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![version, chrono::Utc::now().timestamp()],
    )?;
    Ok(())
}

fn apply_migration(conn: &Connection, version: i32) -> FiredashResult<()> {
    match version {
        1 => apply_migration_v1(conn),
        _ => Err(FiredashError::storage(format!("Unknown migration version: {}", version))),
    }
}

/// Migration v1: keyed JSON records
fn apply_migration_v1(conn: &Connection) -> FiredashResult<()> {
    conn.execute(
        "CREATE TABLE kv_records (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}
