#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError};
use rusqlite::params;

/// Marks older than this are dropped on read.
pub const INVESTIGATED_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvestigatedMark {
    pub path: String,
    pub marked_at_ms: i64,
}

impl SqliteStore {
    /// Re-marking an already marked path refreshes its timestamp.
    pub fn investigated_mark(&mut self, path: &str, now_ms: i64) -> Result<(), StoreError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(StoreError::InvalidInput("path must not be empty"));
        }
        self.conn.execute(
            r#"
            INSERT INTO investigated(path, marked_at_ms)
            VALUES (?1, ?2)
            ON CONFLICT(path) DO UPDATE SET marked_at_ms=excluded.marked_at_ms
            "#,
            params![path, now_ms],
        )?;
        Ok(())
    }

    pub fn investigated_unmark(&mut self, path: &str) -> Result<bool, StoreError> {
        let deleted = self.conn.execute(
            "DELETE FROM investigated WHERE path = ?1",
            params![path.trim()],
        )?;
        Ok(deleted > 0)
    }

    pub fn investigated_clear(&mut self) -> Result<usize, StoreError> {
        Ok(self.conn.execute("DELETE FROM investigated", [])?)
    }

    /// Live marks ordered by path. Expired marks are deleted first.
    pub fn investigated_list(&mut self, now_ms: i64) -> Result<Vec<InvestigatedMark>, StoreError> {
        let cutoff = now_ms.saturating_sub(INVESTIGATED_TTL_MS);
        let tx = self.conn.transaction()?;
        let pruned = tx.execute(
            "DELETE FROM investigated WHERE marked_at_ms < ?1",
            params![cutoff],
        )?;
        if pruned > 0 {
            tracing::debug!(pruned, "expired investigated marks dropped");
        }

        let marks = {
            let mut stmt =
                tx.prepare("SELECT path, marked_at_ms FROM investigated ORDER BY path ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok(InvestigatedMark {
                    path: row.get(0)?,
                    marked_at_ms: row.get(1)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        tx.commit()?;
        Ok(marks)
    }
}
