//! Database schema definitions
//!
//! All CREATE TABLE statements for the aigo database.
//! Uses UUIDv7 for primary keys (time-sortable) and Unix milliseconds for time.

/// Schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
--------------------------------------------------------------------------------
-- CHATS
-- Solo conversations between one learner and the tutor
--------------------------------------------------------------------------------

CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY,                    -- UUIDv7
    user_id TEXT,                           -- identity-provider subject, NULL = anonymous
    title TEXT,                             -- generated from the first message
    timestamp INTEGER NOT NULL              -- Unix timestamp ms
);

CREATE INDEX IF NOT EXISTS idx_chats_user ON chats(user_id, timestamp);

--------------------------------------------------------------------------------
-- ROOMS
-- Shared spaces; every message is rewritten by the model before storage
--------------------------------------------------------------------------------

CREATE TABLE IF NOT EXISTS rooms (
    id TEXT PRIMARY KEY,                    -- UUIDv7
    name TEXT NOT NULL,                     -- sanitized, <= 100 chars
    description TEXT NOT NULL DEFAULT '',   -- sanitized, <= 500 chars
    owner_id TEXT NOT NULL,
    public INTEGER NOT NULL DEFAULT 0,
    settings TEXT NOT NULL DEFAULT '{}',    -- JSON object
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_rooms_public ON rooms(public, updated_at);

CREATE TABLE IF NOT EXISTS room_participants (
    room_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    joined_at INTEGER NOT NULL,
    PRIMARY KEY (room_id, user_id),
    FOREIGN KEY (room_id) REFERENCES rooms(id)
);

CREATE INDEX IF NOT EXISTS idx_participants_user ON room_participants(user_id);

--------------------------------------------------------------------------------
-- CHAT MESSAGES
-- Belongs to exactly one of chat_id / room_id
--------------------------------------------------------------------------------

CREATE TABLE IF NOT EXISTS chat_messages (
    id TEXT PRIMARY KEY,                    -- UUIDv7
    chat_id TEXT,
    room_id TEXT,
    user_id TEXT,
    role TEXT NOT NULL,                     -- 'user', 'assistant'
    content TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    CHECK ((chat_id IS NULL) <> (room_id IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_messages_chat ON chat_messages(chat_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_messages_room ON chat_messages(room_id, timestamp);
"#;
