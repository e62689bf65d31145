//! Outbox of finalized text that never reached the server.
//!
//! When a submit fails, or the writer quits with locked but unsaved text, the
//! text is stashed here so it can be retried by hand later. Nothing is retried
//! automatically.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::api::SubmitTarget;
use crate::error::{Error, Result};

/// One stashed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    /// Row identifier.
    pub id: i64,
    /// When the text was stashed.
    pub created: DateTime<Utc>,
    /// Where it was headed.
    pub target: SubmitTarget,
    /// The locked text.
    pub content: String,
    /// BLAKE3 hash of `content`.
    pub content_hash: String,
    /// Failed deliveries so far.
    pub attempts: u32,
    /// Last delivery error, if any.
    pub last_error: Option<String>,
}

impl PendingSubmission {
    /// BLAKE3 hex digest used to spot identical entries.
    #[must_use]
    pub fn compute_hash(content: &str) -> String {
        blake3::hash(content.as_bytes()).to_hex().to_string()
    }
}

/// `SQLite`-backed outbox.
#[derive(Debug)]
pub struct Outbox {
    path: PathBuf,
    conn: Connection,
}

impl Outbox {
    /// Open or create the outbox database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening outbox at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self { path, conn })
    }

    /// In-memory outbox for tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stash `content` bound for `target`.
    ///
    /// Returns the new entry's id, or `None` when an identical entry (same
    /// target, same text) is already pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stash(&self, target: &SubmitTarget, content: &str) -> Result<Option<i64>> {
        let target_json = serde_json::to_string(target)?;
        let hash = PendingSubmission::compute_hash(content);

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM pending WHERE content_hash = ?1 AND target = ?2",
                params![hash, target_json],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            debug!(id, "identical submission already pending");
            return Ok(None);
        }

        self.conn.execute(
            r"
            INSERT INTO pending (created, target, content, content_hash)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![Utc::now().to_rfc3339(), target_json, content, hash],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, destination = %target, "stashed submission for later");
        Ok(Some(id))
    }

    /// All pending entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list(&self) -> Result<Vec<PendingSubmission>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, created, target, content, content_hash, attempts, last_error
            FROM pending ORDER BY id ASC
            ",
        )?;
        let rows = stmt
            .query_map([], Self::row_to_pending)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// One entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<PendingSubmission>> {
        let row = self
            .conn
            .query_row(
                r"
                SELECT id, created, target, content, content_hash, attempts, last_error
                FROM pending WHERE id = ?1
                ",
                [id],
                Self::row_to_pending,
            )
            .optional()?;
        Ok(row)
    }

    /// Count a failed delivery against an entry.
    ///
    /// Returns `false` if the entry does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_failure(&self, id: i64, error: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE pending SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
            params![id, error],
        )?;
        Ok(affected > 0)
    }

    /// Drop an entry (after delivery, or on request).
    ///
    /// Returns `false` if the entry does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM pending WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Number of pending entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM pending", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_pending(row: &rusqlite::Row) -> rusqlite::Result<PendingSubmission> {
        let created: String = row.get(1)?;
        let target: String = row.get(2)?;

        let created = DateTime::parse_from_rfc3339(&created).map_or_else(
            |_| {
                warn!("Unparseable timestamp in outbox: {created}");
                DateTime::<Utc>::UNIX_EPOCH
            },
            |dt| dt.with_timezone(&Utc),
        );
        let target = serde_json::from_str(&target).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(PendingSubmission {
            id: row.get(0)?,
            created,
            target,
            content: row.get(3)?,
            content_hash: row.get(4)?,
            attempts: row.get(5)?,
            last_error: row.get(6)?,
        })
    }
}
