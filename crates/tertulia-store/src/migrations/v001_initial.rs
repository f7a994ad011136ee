//! v001 -- Initial schema creation.
//!
//! Creates the four application tables: `user_profiles`,
//! `global_chat_messages`, `private_chats` and `private_chat_messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- User profiles (one per account, same id)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS user_profiles (
    id           TEXT PRIMARY KEY NOT NULL,
    email        TEXT NOT NULL,
    created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    display_name TEXT,
    career       TEXT,
    bio          TEXT
);

-- ----------------------------------------------------------------
-- Global chat
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS global_chat_messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id  TEXT,
    email      TEXT NOT NULL,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

-- ----------------------------------------------------------------
-- Private conversations: one row per unordered pair of users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS private_chats (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id1   TEXT NOT NULL,
    user_id2   TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),

    UNIQUE (user_id1, user_id2),
    CHECK (user_id1 < user_id2)
);

CREATE TABLE IF NOT EXISTS private_chat_messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id    INTEGER NOT NULL,              -- FK -> private_chats(id)
    sender_id  TEXT NOT NULL,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),

    FOREIGN KEY (chat_id) REFERENCES private_chats(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_private_chat_messages_chat
    ON private_chat_messages(chat_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
