//! Room CRUD operations
//!
//! Rooms are shared spaces where learners post messages that the model
//! rewrites into English. Participants live in `room_participants`.

use super::{from_ms, new_id, now_ms, Database};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A room in the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    /// Participant user ids in join order. The owner is always first.
    pub participants: Vec<String>,
    pub owner_id: String,
    pub public: bool,
    pub settings: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Room {
    /// Create a new room with the owner as sole participant
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let owner_id = owner_id.into();
        let now = from_ms(now_ms());
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            participants: vec![owner_id.clone()],
            owner_id,
            public: false,
            settings: Map::new(),
            created_at: now,
            updated_at: Some(now),
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Whether a user may read this room's messages
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.public || self.is_participant(user_id)
    }
}

/// Row shape of `rooms` before participants are attached
struct RoomRow {
    id: String,
    name: String,
    description: String,
    owner_id: String,
    public: bool,
    settings: String,
    created_at: i64,
    updated_at: Option<i64>,
}

const ROOM_COLUMNS: &str =
    "id, name, description, owner_id, public, settings, created_at, updated_at";

impl RoomRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            owner_id: row.get(3)?,
            public: row.get(4)?,
            settings: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_room(self, conn: &Connection) -> Result<Room> {
        let settings: Map<String, Value> = serde_json::from_str(&self.settings)
            .with_context(|| format!("invalid settings json for room {}", self.id))?;
        let participants = participants_of(conn, &self.id)?;
        Ok(Room {
            id: self.id,
            name: self.name,
            description: self.description,
            participants,
            owner_id: self.owner_id,
            public: self.public,
            settings,
            created_at: from_ms(self.created_at),
            updated_at: self.updated_at.map(from_ms),
        })
    }
}

fn participants_of(conn: &Connection, room_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id FROM room_participants WHERE room_id = ?1
             ORDER BY joined_at, rowid",
        )
        .context("failed to prepare participants query")?;

    let participants = stmt
        .query(params![room_id])?
        .mapped(|row| row.get(0))
        .collect::<Result<Vec<String>, _>>()
        .context("failed to list participants")?;

    Ok(participants)
}

fn rooms_from(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Room>> {
    let mut stmt = conn.prepare(sql).context("failed to prepare rooms query")?;
    let rows = stmt
        .query(args)?
        .mapped(RoomRow::from_row)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to list rooms")?;

    rows.into_iter().map(|r| r.into_room(conn)).collect()
}

// Database operations
impl Database {
    /// Insert a new room together with its initial participants
    pub fn insert_room(&self, room: &Room) -> Result<()> {
        let settings = serde_json::to_string(&room.settings)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO rooms ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                ROOM_COLUMNS
            ),
            params![
                room.id,
                room.name,
                room.description,
                room.owner_id,
                room.public,
                settings,
                room.created_at.timestamp_millis(),
                room.updated_at.map(|t| t.timestamp_millis())
            ],
        )
        .context("failed to insert room")?;
        for user_id in &room.participants {
            tx.execute(
                "INSERT OR IGNORE INTO room_participants (room_id, user_id, joined_at)
                 VALUES (?1, ?2, ?3)",
                params![room.id, user_id, room.created_at.timestamp_millis()],
            )
            .context("failed to insert participant")?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Get room by ID
    pub fn get_room(&self, id: &str) -> Result<Option<Room>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM rooms WHERE id = ?1", ROOM_COLUMNS))
            .context("failed to prepare room query")?;

        let row = stmt
            .query_row(params![id], RoomRow::from_row)
            .optional()
            .context("failed to query room")?;

        row.map(|r| r.into_room(&conn)).transpose()
    }

    /// Rooms a user participates in, most recently active first
    pub fn list_rooms_for_participant(&self, user_id: &str) -> Result<Vec<Room>> {
        let conn = self.conn()?;
        rooms_from(
            &conn,
            &format!(
                "SELECT {} FROM rooms
                 WHERE id IN (SELECT room_id FROM room_participants WHERE user_id = ?1)
                 ORDER BY updated_at DESC, created_at DESC",
                ROOM_COLUMNS
            ),
            params![user_id],
        )
    }

    /// All public rooms, most recently active first
    pub fn list_public_rooms(&self) -> Result<Vec<Room>> {
        let conn = self.conn()?;
        rooms_from(
            &conn,
            &format!(
                "SELECT {} FROM rooms WHERE public = 1
                 ORDER BY updated_at DESC, created_at DESC",
                ROOM_COLUMNS
            ),
            [],
        )
    }

    /// List every room (admin use)
    pub fn list_rooms(&self) -> Result<Vec<Room>> {
        let conn = self.conn()?;
        rooms_from(
            &conn,
            &format!("SELECT {} FROM rooms ORDER BY created_at", ROOM_COLUMNS),
            [],
        )
    }

    /// Add a participant. Returns false if they were already in the room.
    ///
    /// Bumps `updated_at` only when membership actually changed.
    pub fn add_participant(&self, room_id: &str, user_id: &str) -> Result<bool> {
        let now = now_ms();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO room_participants (room_id, user_id, joined_at)
                 VALUES (?1, ?2, ?3)",
                params![room_id, user_id, now],
            )
            .context("failed to add participant")?;
        if inserted > 0 {
            tx.execute(
                "UPDATE rooms SET updated_at = ?2 WHERE id = ?1",
                params![room_id, now],
            )
            .context("failed to touch room")?;
        }
        tx.commit()?;
        Ok(inserted > 0)
    }

    /// Replace a room's description
    pub fn set_room_description(&self, room_id: &str, description: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE rooms SET description = ?2, updated_at = ?3 WHERE id = ?1",
            params![room_id, description, now_ms()],
        )
        .context("failed to update room description")?;
        Ok(())
    }

    /// Mark a room as recently active
    pub fn touch_room(&self, room_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE rooms SET updated_at = ?2 WHERE id = ?1",
            params![room_id, now_ms()],
        )
        .context("failed to touch room")?;
        Ok(())
    }
}
