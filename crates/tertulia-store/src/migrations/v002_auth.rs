use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS auth_users (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,              -- hex BLAKE3 derive-key output
    salt          TEXT NOT NULL,              -- hex-encoded 16 random bytes
    created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

-- At most one persisted session per database
CREATE TABLE IF NOT EXISTS auth_session (
    id      INTEGER PRIMARY KEY CHECK (id = 1),
    user_id TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES auth_users(id) ON DELETE CASCADE
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
