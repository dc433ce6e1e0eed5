#![forbid(unsafe_code)]

use super::kv::{FILTER_KEY, MIRROR_KEY};
use super::{SqliteStore, StoreError};
use rv_core::{PersistError, StateStore};
use std::collections::BTreeMap;

impl SqliteStore {
    pub fn filter_load(&self) -> Result<Option<BTreeMap<String, bool>>, StoreError> {
        let Some(raw) = self.kv_get(FILTER_KEY)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn filter_save(&mut self, active: &BTreeMap<String, bool>) -> Result<(), StoreError> {
        let raw = serde_json::to_string(active)?;
        self.kv_set(FILTER_KEY, &raw)
    }

    pub fn mirror_load(&self) -> Result<Option<Vec<String>>, StoreError> {
        let Some(raw) = self.kv_get(MIRROR_KEY)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn mirror_save(&mut self, paths: &[String]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(paths)?;
        self.kv_set(MIRROR_KEY, &raw)
    }
}

impl StateStore for SqliteStore {
    fn load_filter(&mut self) -> Result<Option<BTreeMap<String, bool>>, PersistError> {
        self.filter_load().map_err(persist)
    }

    fn save_filter(&mut self, active: &BTreeMap<String, bool>) -> Result<(), PersistError> {
        self.filter_save(active).map_err(persist)
    }

    fn load_investigated_mirror(&mut self) -> Result<Option<Vec<String>>, PersistError> {
        self.mirror_load().map_err(persist)
    }

    fn save_investigated_mirror(&mut self, paths: &[String]) -> Result<(), PersistError> {
        self.mirror_save(paths).map_err(persist)
    }
}

fn persist(err: StoreError) -> PersistError {
    PersistError(err.to_string())
}
