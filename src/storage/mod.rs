//! Durable keyed records backed by SQLite.
//!
//! Each record is one JSON document stored under a fixed string key; the
//! history and settings stores each own one key.

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub mod migrations;

use crate::config::DatabaseConfig;
use crate::error::{FiredashError, FiredashResult};

/// Storage manager for keyed JSON records
pub struct StorageManager {
    connection: Arc<Mutex<Connection>>,
}

impl StorageManager {
    /// Open (or create) the database file and run migrations
    pub async fn new(config: &DatabaseConfig) -> FiredashResult<Self> {
        info!("Initializing storage manager with database: {}", config.path.display());

        if let Some(parent) = config.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let connection = Connection::open(&config.path)?;
        Self::from_connection(connection)
    }

    /// Throwaway database, used by tests and dry runs
    pub fn in_memory() -> FiredashResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> FiredashResult<Self> {
        migrations::run_migrations(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Read and decode the record stored under `key`
    pub async fn get_record<T: DeserializeOwned>(&self, key: &str) -> FiredashResult<Option<T>> {
        let conn = self.connection.lock().await;

        let raw: Option<String> = conn
            .query_row("SELECT value FROM kv_records WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;

        raw.map(|value| {
            serde_json::from_str(&value)
                .map_err(|e| FiredashError::storage(format!("Corrupt record '{}': {}", key, e)))
        })
        .transpose()
    }

    /// Insert or replace the record stored under `key`
    pub async fn put_record<T: Serialize>(&self, key: &str, value: &T) -> FiredashResult<()> {
        let encoded = serde_json::to_string(value)
            .map_err(|e| FiredashError::storage(format!("Failed to encode record '{}': {}", key, e)))?;

        let conn = self.connection.lock().await;
        conn.execute(
            "INSERT INTO kv_records (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, encoded, chrono::Utc::now().timestamp()],
        )?;

        debug!("Stored record '{}' ({} bytes)", key, encoded.len());
        Ok(())
    }

    /// Delete the record under `key`; returns whether one existed
    pub async fn remove_record(&self, key: &str) -> FiredashResult<bool> {
        let conn = self.connection.lock().await;
        let removed = conn.execute("DELETE FROM kv_records WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}
