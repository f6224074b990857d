//! Chat message operations
//!
//! Messages belong to exactly one of a solo chat or a room. Solo messages
//! are append-only; room messages can be hard-deleted by their owner.

use super::{from_ms, new_id, now_ms, Database};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who authored a message, from the model's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(anyhow::anyhow!("unknown message role: {}", other)),
        }
    }
}

/// A single stored message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub user_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message in a solo chat
    pub fn in_chat(
        chat_id: impl Into<String>,
        user_id: Option<String>,
        role: Role,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            chat_id: Some(chat_id.into()),
            room_id: None,
            user_id,
            role,
            content: content.into(),
            timestamp: from_ms(now_ms()),
        }
    }

    /// Create a message in a room
    pub fn in_room(
        room_id: impl Into<String>,
        user_id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            chat_id: None,
            room_id: Some(room_id.into()),
            user_id: Some(user_id.into()),
            role,
            content: content.into(),
            timestamp: from_ms(now_ms()),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let role: String = row.get(4)?;
        let role = role.parse().map_err(|e: anyhow::Error| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
        })?;
        Ok(Self {
            id: row.get(0)?,
            chat_id: row.get(1)?,
            room_id: row.get(2)?,
            user_id: row.get(3)?,
            role,
            content: row.get(5)?,
            timestamp: from_ms(row.get(6)?),
        })
    }
}

const MESSAGE_COLUMNS: &str = "id, chat_id, room_id, user_id, role, content, timestamp";

impl Database {
    /// Insert a new message
    pub fn insert_message(&self, msg: &ChatMessage) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO chat_messages (id, chat_id, room_id, user_id, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                msg.id,
                msg.chat_id,
                msg.room_id,
                msg.user_id,
                msg.role.as_str(),
                msg.content,
                msg.timestamp.timestamp_millis()
            ],
        )
        .context("failed to insert message")?;
        Ok(())
    }

    /// Get message by ID
    pub fn get_message(&self, id: &str) -> Result<Option<ChatMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM chat_messages WHERE id = ?1",
                MESSAGE_COLUMNS
            ))
            .context("failed to prepare message query")?;

        let msg = stmt
            .query_row(params![id], ChatMessage::from_row)
            .optional()
            .context("failed to query message")?;

        Ok(msg)
    }

    /// Messages of a solo chat, oldest first
    ///
    /// With a user, only that user's messages in the chat are returned.
    pub fn list_chat_messages(
        &self,
        chat_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<ChatMessage>> {
        let conn = self.conn()?;
        let messages = match user_id {
            Some(user_id) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM chat_messages WHERE chat_id = ?1 AND user_id = ?2
                         ORDER BY timestamp, id",
                        MESSAGE_COLUMNS
                    ))
                    .context("failed to prepare chat messages query")?;
                let rows = stmt
                    .query(params![chat_id, user_id])?
                    .mapped(ChatMessage::from_row)
                    .collect::<Result<Vec<_>, _>>();
                rows
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM chat_messages WHERE chat_id = ?1 ORDER BY timestamp, id",
                        MESSAGE_COLUMNS
                    ))
                    .context("failed to prepare chat messages query")?;
                let rows = stmt
                    .query(params![chat_id])?
                    .mapped(ChatMessage::from_row)
                    .collect::<Result<Vec<_>, _>>();
                rows
            }
        }
        .context("failed to list chat messages")?;

        Ok(messages)
    }

    /// Messages of a room, oldest first
    pub fn list_room_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM chat_messages WHERE room_id = ?1 ORDER BY timestamp, id",
                MESSAGE_COLUMNS
            ))
            .context("failed to prepare room messages query")?;

        let messages = stmt
            .query(params![room_id])?
            .mapped(ChatMessage::from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to list room messages")?;

        Ok(messages)
    }

    /// Hard-delete a message. Returns whether a row was removed.
    pub fn delete_message(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn
            .execute("DELETE FROM chat_messages WHERE id = ?1", params![id])
            .context("failed to delete message")?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Separate timestamps so ordering never depends on id tie-breaks.
    fn tick() {
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    #[test]
    fn test_chat_messages_scoped_by_user() -> Result<()> {
        let db = Database::in_memory()?;

        db.insert_message(&ChatMessage::in_chat("c1", Some("alice".into()), Role::User, "hi"))?;
        tick();
        db.insert_message(&ChatMessage::in_chat(
            "c1",
            Some("alice".into()),
            Role::Assistant,
            "hello!",
        ))?;
        db.insert_message(&ChatMessage::in_chat("c1", Some("bob".into()), Role::User, "yo"))?;
        db.insert_message(&ChatMessage::in_chat("c2", Some("alice".into()), Role::User, "x"))?;

        let alice = db.list_chat_messages("c1", Some("alice"))?;
        let contents: Vec<_> = alice.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "hello!"]);
        assert_eq!(alice[1].role, Role::Assistant);

        let everyone = db.list_chat_messages("c1", None)?;
        assert_eq!(everyone.len(), 3);

        Ok(())
    }

    #[test]
    fn test_room_messages_and_delete() -> Result<()> {
        let db = Database::in_memory()?;

        let first = ChatMessage::in_room("r1", "alice", Role::User, "Good morning.");
        tick();
        let second = ChatMessage::in_room("r1", "bob", Role::User, "Nice weather today.");
        db.insert_message(&first)?;
        db.insert_message(&second)?;
        db.insert_message(&ChatMessage::in_room("r2", "bob", Role::User, "elsewhere"))?;

        let messages = db.list_room_messages("r1")?;
        assert_eq!(messages, vec![first.clone(), second.clone()]);

        assert!(db.delete_message(&first.id)?);
        assert!(!db.delete_message(&first.id)?);
        assert!(db.get_message(&first.id)?.is_none());
        assert_eq!(db.list_room_messages("r1")?, vec![second]);

        Ok(())
    }

    #[test]
    fn test_message_must_have_exactly_one_parent() -> Result<()> {
        let db = Database::in_memory()?;

        let mut orphan = ChatMessage::in_room("r1", "alice", Role::User, "lost");
        orphan.room_id = None;
        assert!(db.insert_message(&orphan).is_err());

        let mut both = ChatMessage::in_room("r1", "alice", Role::User, "torn");
        both.chat_id = Some("c1".into());
        assert!(db.insert_message(&both).is_err());

        Ok(())
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!(format!("{}", Role::Assistant), "assistant");
        assert!("developer".parse::<Role>().is_err());
    }
}
