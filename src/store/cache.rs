//! Exact-match answer cache plus the conversation record written with it.

use rusqlite::{OptionalExtension, params};

use super::conversations::{Role, Turn};
use super::{Store, now_timestamp};
use crate::error::AppError;

/// What [`Store::store_answer`] did to the cache table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    Inserted,
    /// The question already had an entry; its answer was replaced.
    Replaced,
}

impl Store {
    /// Cached answer for `question`. The match is byte-for-byte: no trimming,
    /// no case folding.
    pub fn lookup_answer(&self, question: &str) -> Result<Option<String>, AppError> {
        self.conn
            .query_row(
                "SELECT answer FROM questions WHERE question = ?1 ORDER BY id LIMIT 1",
                params![question],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map(Option::flatten)
            .map_err(|e| AppError::Store(format!("lookup answer: {e}")))
    }

    /// Cache `answer` for `question` and log the exchange as a conversation,
    /// in one transaction. Either both rows land or neither does.
    ///
    /// At most one cache entry exists per question: an existing entry has its
    /// answer replaced rather than gaining a sibling.
    pub fn store_answer(&mut self, question: &str, answer: &str) -> Result<CacheWrite, AppError> {
        let messages = serde_json::to_string(&[
            Turn { role: Role::User, content: question.to_string() },
            Turn { role: Role::Assistant, content: answer.to_string() },
        ])
        .map_err(|e| AppError::Store(format!("serialise transcript: {e}")))?;
        let ts = now_timestamp();

        let tx = self
            .conn
            .transaction()
            .map_err(|e| AppError::Store(format!("begin store_answer: {e}")))?;

        let replaced = tx
            .execute(
                "UPDATE questions SET answer = ?2 WHERE question = ?1",
                params![question, answer],
            )
            .map_err(|e| AppError::Store(format!("update answer: {e}")))?;

        if replaced == 0 {
            tx.execute(
                "INSERT INTO questions (question, answer, count, timestamp) VALUES (?1, ?2, 1, ?3)",
                params![question, answer, ts],
            )
            .map_err(|e| AppError::Store(format!("insert answer: {e}")))?;
        }

        tx.execute(
            "INSERT INTO conversations (messages, timestamp) VALUES (?1, ?2)",
            params![messages, ts],
        )
        .map_err(|e| AppError::Store(format!("insert conversation: {e}")))?;

        tx.commit()
            .map_err(|e| AppError::Store(format!("commit store_answer: {e}")))?;

        Ok(if replaced == 0 { CacheWrite::Inserted } else { CacheWrite::Replaced })
    }
}
