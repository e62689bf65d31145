//! `SQLite` schema for the pending-submission outbox.

/// SQL statement to create the pending submissions table.
pub const CREATE_PENDING_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS pending (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created TEXT NOT NULL,
    target TEXT NOT NULL,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT
)
";

/// Index used to find an identical pending entry before stashing.
pub const CREATE_HASH_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_pending_hash ON pending(content_hash)
";

/// Key-value metadata, holds the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_PENDING_TABLE,
    CREATE_HASH_INDEX,
    CREATE_METADATA_TABLE,
];
