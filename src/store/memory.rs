//! Agent memory — an append-only, ordered list of text items replayed as
//! context on every agent turn.

use rusqlite::params;

use super::{Store, now_timestamp};
use crate::error::AppError;

impl Store {
    pub fn append_memory(&self, text: &str) -> Result<(), AppError> {
        self.conn
            .execute(
                "INSERT INTO agent_memory (memory_item, timestamp) VALUES (?1, ?2)",
                params![text, now_timestamp()],
            )
            .map(|_| ())
            .map_err(|e| AppError::Store(format!("append memory: {e}")))
    }

    /// Append a user line and the reply to it as one unit, so memory never
    /// holds half an exchange.
    pub fn append_exchange(&mut self, user: &str, reply: &str) -> Result<(), AppError> {
        let ts = now_timestamp();
        let tx = self
            .conn
            .transaction()
            .map_err(|e| AppError::Store(format!("begin append_exchange: {e}")))?;
        for item in [user, reply] {
            tx.execute(
                "INSERT INTO agent_memory (memory_item, timestamp) VALUES (?1, ?2)",
                params![item, ts],
            )
            .map_err(|e| AppError::Store(format!("append memory: {e}")))?;
        }
        tx.commit()
            .map_err(|e| AppError::Store(format!("commit append_exchange: {e}")))
    }

    /// Every memory item, oldest first.
    pub fn load_memory(&self) -> Result<Vec<String>, AppError> {
        let mut stmt = self
            .conn
            .prepare("SELECT memory_item FROM agent_memory ORDER BY id ASC")
            .map_err(|e| AppError::Store(format!("prepare load_memory: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))
            .map_err(|e| AppError::Store(format!("query load_memory: {e}")))?;

        let mut items = Vec::new();
        for row in rows {
            let item = row.map_err(|e| AppError::Store(format!("read memory row: {e}")))?;
            items.push(item.unwrap_or_default());
        }
        Ok(items)
    }

    /// Delete every memory item. Returns how many were removed.
    pub fn clear_memory(&self) -> Result<usize, AppError> {
        self.conn
            .execute("DELETE FROM agent_memory", [])
            .map_err(|e| AppError::Store(format!("clear memory: {e}")))
    }

    /// Keep only the newest `keep` items, evicting oldest first. Returns how
    /// many were evicted.
    pub fn trim_memory(&self, keep: usize) -> Result<usize, AppError> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        self.conn
            .execute(
                "DELETE FROM agent_memory WHERE id NOT IN \
                 (SELECT id FROM agent_memory ORDER BY id DESC LIMIT ?1)",
                params![keep],
            )
            .map_err(|e| AppError::Store(format!("trim memory: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use crate::store::testing::temp_store;

    #[test]
    fn accumulate_then_clear() {
        let (_tmp, store) = temp_store();
        store.append_memory("a").unwrap();
        store.append_memory("b").unwrap();
        assert_eq!(store.load_memory().unwrap(), ["a", "b"]);

        assert_eq!(store.clear_memory().unwrap(), 2);
        assert!(store.load_memory().unwrap().is_empty());
    }

    #[test]
    fn clear_on_empty_is_fine() {
        let (_tmp, store) = temp_store();
        assert_eq!(store.clear_memory().unwrap(), 0);
    }

    #[test]
    fn exchange_appends_in_order() {
        let (_tmp, mut store) = temp_store();
        store.append_exchange("what is 2+2", "4").unwrap();
        store.append_exchange("and times 3?", "12").unwrap();
        assert_eq!(store.load_memory().unwrap(), ["what is 2+2", "4", "and times 3?", "12"]);
    }

    #[test]
    fn load_has_no_cap() {
        let (_tmp, store) = temp_store();
        for i in 0..250 {
            store.append_memory(&i.to_string()).unwrap();
        }
        let items = store.load_memory().unwrap();
        assert_eq!(items.len(), 250);
        assert_eq!(items.first().map(String::as_str), Some("0"));
        assert_eq!(items.last().map(String::as_str), Some("249"));
    }

    #[test]
    fn trim_evicts_oldest() {
        let (_tmp, store) = temp_store();
        for item in ["1", "2", "3", "4", "5"] {
            store.append_memory(item).unwrap();
        }
        assert_eq!(store.trim_memory(2).unwrap(), 3);
        assert_eq!(store.load_memory().unwrap(), ["4", "5"]);
        assert_eq!(store.trim_memory(10).unwrap(), 0);
    }

    #[test]
    fn memory_is_independent_of_cache() {
        let (_tmp, mut store) = temp_store();
        store.store_answer("q", "a").unwrap();
        store.append_memory("m").unwrap();
        store.clear_memory().unwrap();
        assert_eq!(store.lookup_answer("q").unwrap().as_deref(), Some("a"));
        assert_eq!(store.recent_conversations(10).unwrap().len(), 1);
    }
}
