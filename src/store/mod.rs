//! Persistent store — answer cache, conversation log and agent memory in a
//! single SQLite file.
//!
//! Layout (compatible with caches written by earlier cbot releases):
//!
//! ```text
//! ~/.cbot_cache
//! ├── questions      (id, question, answer, count, timestamp)
//! ├── conversations  (id, messages JSON, timestamp)
//! └── agent_memory   (id, memory_item, timestamp)
//! ```
//!
//! [`Store`] owns the only connection. All I/O is synchronous; every method
//! returns a typed error and leaves the degrade-or-abort decision to the
//! caller.

mod cache;
mod conversations;
mod memory;

use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::AppError;

pub use cache::CacheWrite;
pub use conversations::{Role, Transcript, Turn};

/// Fixed database filename under the user's home directory.
pub const DB_FILENAME: &str = ".cbot_cache";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Also accepts the fractional seconds some writers append.
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS questions (
    id        INTEGER PRIMARY KEY,
    question  TEXT,
    answer    TEXT,
    count     INTEGER DEFAULT 1,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS questions_question ON questions (question);
CREATE TABLE IF NOT EXISTS conversations (
    id        INTEGER PRIMARY KEY,
    messages  TEXT,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS agent_memory (
    id          INTEGER PRIMARY KEY,
    memory_item TEXT,
    timestamp   DATETIME DEFAULT CURRENT_TIMESTAMP
);
";

pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// `~/.cbot_cache`.
    pub fn default_path() -> Result<PathBuf, AppError> {
        dirs::home_dir()
            .map(|home| home.join(DB_FILENAME))
            .ok_or_else(|| AppError::Store("cannot determine home directory".into()))
    }

    /// Open the database at [`Store::default_path`].
    pub fn open_default() -> Result<Self, AppError> {
        Self::open(&Self::default_path()?)
    }

    /// Open or create the database at `path` and make sure all three tables
    /// exist. Safe to call on an existing file.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let conn = Connection::open(path)
            .map_err(|e| AppError::Store(format!("cannot open {}: {e}", path.display())))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Store(format!("cannot initialise {}: {e}", path.display())))?;
        debug!(path = %path.display(), "store opened");
        Ok(Self { conn, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the connection. Call once at process exit.
    pub fn close(self) -> Result<(), AppError> {
        let path = self.path;
        self.conn.close().map_err(|(_, e)| {
            warn!(path = %path.display(), error = %e, "store close failed");
            AppError::Store(format!("cannot close {}: {e}", path.display()))
        })
    }
}

fn now_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_PARSE_FORMAT).ok()
}
