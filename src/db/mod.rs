//! Database module for aigo
//!
//! Provides persistence for solo chats, chat messages, and rooms.
//! Uses SQLite with UUIDv7 for primary keys and millisecond timestamps.

mod schema;

pub mod chats;
pub mod messages;
pub mod rooms;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

pub use chats::Chat;
pub use messages::{ChatMessage, Role};
pub use rooms::Room;
pub use schema::{SCHEMA, SCHEMA_VERSION};

/// Generate a new UUIDv7 (time-sorted)
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Get current Unix timestamp in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a stored millisecond timestamp back into a UTC datetime
pub(crate) fn from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

/// Database handle (thread-safe via Mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Acquire the database connection, converting PoisonError to anyhow::Error.
    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("database lock poisoned: {}", e))
    }

    /// Open or create database at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("failed to open database at {:?}", path.as_ref()))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Initialize schema and run migrations
    fn init(&self) -> Result<()> {
        let version = self.get_schema_version()?;

        if version < SCHEMA_VERSION {
            self.conn()?
                .execute_batch(SCHEMA)
                .context("failed to create schema")?;
            self.set_schema_version(SCHEMA_VERSION)?;
            tracing::info!("initialized database schema version {}", SCHEMA_VERSION);
        }

        Ok(())
    }

    /// Get current schema version from user_version pragma
    fn get_schema_version(&self) -> Result<i32> {
        let conn = self.conn()?;
        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .context("failed to get schema version")?;
        Ok(version)
    }

    /// Set schema version using user_version pragma
    fn set_schema_version(&self, version: i32) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(&format!("PRAGMA user_version = {}", version), [])
            .context("failed to set schema version")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_valid_uuid() {
        let id = new_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_new_id_is_sortable() {
        let id1 = new_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = new_id();
        assert!(id2 > id1);
    }

    #[test]
    fn test_database_init() -> Result<()> {
        let db = Database::in_memory()?;
        let version = db.get_schema_version()?;
        assert_eq!(version, SCHEMA_VERSION);
        Ok(())
    }

    #[test]
    fn test_timestamp_roundtrip_keeps_millis() {
        let ms = now_ms();
        assert_eq!(from_ms(ms).timestamp_millis(), ms);
    }
}
