//! Schema bootstrap.
//!
//! Creates the four core tables: `messages`, `sessions`, `pre_keys` and
//! `one_time_keys`.  Creation is idempotent (`IF NOT EXISTS`) and runs once,
//! in the background, after [`Store::open`](crate::Store::open) returns.

use rusqlite::Connection;

/// SQL executed on first open.
const SCHEMA_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    nonce     TEXT PRIMARY KEY NOT NULL,  -- hex-encoded encryption nonce
    sender    TEXT NOT NULL,              -- UUID of the sending user
    recipient TEXT,                       -- UUID; NULL for group messages
    group_id  TEXT,                       -- UUID; NULL for direct messages
    mail_id   TEXT NOT NULL,              -- server-assigned delivery ID
    body      TEXT NOT NULL,              -- plaintext or ciphertext
    direction TEXT NOT NULL,              -- 'incoming' | 'outgoing'
    timestamp TEXT NOT NULL,              -- ISO-8601 / RFC-3339
    decrypted INTEGER NOT NULL DEFAULT 0  -- boolean 0/1
);

CREATE INDEX IF NOT EXISTS idx_messages_sender    ON messages(sender);
CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient);
CREATE INDEX IF NOT EXISTS idx_messages_group     ON messages(group_id);

-- ----------------------------------------------------------------
-- Sessions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sessions (
    session_id  TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    user_id     TEXT NOT NULL,              -- owning remote identity
    sk          TEXT NOT NULL UNIQUE,       -- hex-encoded session key
    public_key  TEXT NOT NULL,              -- hex-encoded X25519 pubkey
    fingerprint TEXT NOT NULL,              -- hex-encoded fingerprint
    mode        TEXT NOT NULL,              -- 'initiator' | 'receiver'
    last_used   TEXT NOT NULL,              -- ISO-8601
    verified    INTEGER NOT NULL DEFAULT 0  -- boolean 0/1
);

-- ----------------------------------------------------------------
-- Pre-keys / one-time keys
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS pre_keys (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    key_id      TEXT UNIQUE,                -- optional secondary identifier
    user_id     TEXT,                       -- optional owner
    private_key TEXT NOT NULL,              -- hex-encoded X25519 secret
    public_key  TEXT NOT NULL,              -- hex-encoded X25519 pubkey
    signature   TEXT NOT NULL               -- hex-encoded signature
);

CREATE TABLE IF NOT EXISTS one_time_keys (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    key_id      TEXT UNIQUE,
    user_id     TEXT,
    private_key TEXT NOT NULL,
    public_key  TEXT NOT NULL,
    signature   TEXT NOT NULL
);
"#;

/// Create any missing tables.
pub fn create_tables(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}

/// One sanity read against `pre_keys` to confirm the connection is usable
/// before the store reports ready.
pub fn sanity_check(conn: &Connection) -> Result<(), rusqlite::Error> {
    let _count: i64 = conn.query_row("SELECT COUNT(*) FROM pre_keys", [], |row| row.get(0))?;
    Ok(())
}
