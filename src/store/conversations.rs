//! Conversation log — one JSON transcript per question/answer cycle.

use chrono::NaiveDateTime;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Store, parse_timestamp};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of a transcript, stored as `{"role": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub id: i64,
    /// `None` when the stored timestamp is missing or unreadable.
    pub created_at: Option<NaiveDateTime>,
    pub turns: Vec<Turn>,
}

impl Store {
    /// Up to `limit` transcripts, newest first.
    ///
    /// A row that does not decode is reported as an error naming its id;
    /// it is never skipped.
    pub fn recent_conversations(&self, limit: usize) -> Result<Vec<Transcript>, AppError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self
            .conn
            .prepare("SELECT id, messages, timestamp FROM conversations ORDER BY id DESC LIMIT ?1")
            .map_err(|e| AppError::Store(format!("prepare recent_conversations: {e}")))?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(|e| AppError::Store(format!("query recent_conversations: {e}")))?;

        let mut transcripts = Vec::new();
        for row in rows {
            let (id, messages, timestamp) =
                row.map_err(|e| AppError::Store(format!("read conversation row: {e}")))?;
            transcripts.push(decode(id, messages.as_deref(), timestamp.as_deref())?);
        }
        Ok(transcripts)
    }
}

fn decode(id: i64, messages: Option<&str>, timestamp: Option<&str>) -> Result<Transcript, AppError> {
    let corrupt = |what: String| AppError::Corrupt(format!("conversation {id}: {what}"));

    let messages = messages.ok_or_else(|| corrupt("messages is NULL".into()))?;
    let turns: Vec<Turn> =
        serde_json::from_str(messages).map_err(|e| corrupt(format!("bad transcript JSON: {e}")))?;
    let created_at = timestamp.and_then(parse_timestamp);
    if created_at.is_none() {
        warn!(id, ?timestamp, "conversation has no readable timestamp");
    }

    Ok(Transcript { id, created_at, turns })
}
