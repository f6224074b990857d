//! Solo chat operations
//!
//! A chat is the metadata header of a one-on-one tutor conversation.
//! Its messages live in `chat_messages` keyed by `chat_id`.

use super::{from_ms, new_id, now_ms, Database};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// A solo conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Chat {
    /// Create a new chat, optionally owned by a user
    pub fn new(user_id: Option<String>, title: Option<String>) -> Self {
        Self {
            id: new_id(),
            user_id,
            title,
            timestamp: from_ms(now_ms()),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            timestamp: from_ms(row.get(3)?),
        })
    }
}

impl Database {
    /// Insert a new chat
    pub fn insert_chat(&self, chat: &Chat) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO chats (id, user_id, title, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![
                chat.id,
                chat.user_id,
                chat.title,
                chat.timestamp.timestamp_millis()
            ],
        )
        .context("failed to insert chat")?;
        Ok(())
    }

    /// Get chat by ID
    pub fn get_chat(&self, id: &str) -> Result<Option<Chat>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, user_id, title, timestamp FROM chats WHERE id = ?1")
            .context("failed to prepare chat query")?;

        let chat = stmt
            .query_row(params![id], Chat::from_row)
            .optional()
            .context("failed to query chat")?;

        Ok(chat)
    }

    /// List a user's chats, newest first
    pub fn list_chats_for_user(&self, user_id: &str) -> Result<Vec<Chat>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, title, timestamp FROM chats
                 WHERE user_id = ?1 ORDER BY timestamp DESC, id DESC",
            )
            .context("failed to prepare chats query")?;

        let chats = stmt
            .query(params![user_id])?
            .mapped(Chat::from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to list chats")?;

        Ok(chats)
    }
}
