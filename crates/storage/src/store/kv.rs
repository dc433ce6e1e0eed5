#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError};
use rusqlite::{OptionalExtension, params};

pub const FILTER_KEY: &str = "recon.filter.active";
pub const MIRROR_KEY: &str = "recon.investigated";

impl SqliteStore {
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    pub fn kv_set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if key.trim().is_empty() {
            return Err(StoreError::InvalidInput("key must not be empty"));
        }
        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO kv(key, value, updated_at_ms)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at_ms=excluded.updated_at_ms
            "#,
            params![key, value, now_ms],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn kv_delete(&mut self, key: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(deleted > 0)
    }
}
