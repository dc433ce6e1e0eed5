#![forbid(unsafe_code)]

use crate::error::{PersistError, TransportError};
use crate::investigated::InvestigateAction;
use crate::model::Tree;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    pub content: String,
}

/// One poll result from the scanner side, already validated against the taxonomy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconSnapshot {
    pub tree: Tree,
    pub investigated_files: Vec<String>,
    pub dim_counts: BTreeMap<String, usize>,
    pub files_scanned: usize,
    pub total_findings: usize,
    pub critical: usize,
    pub warnings: usize,
    pub clean_files: usize,
    pub recon_available: bool,
    /// Unix seconds.
    pub scanned_at: i64,
    /// Findings dropped at the transport boundary.
    pub quarantined: usize,
}

impl ReconSnapshot {
    pub fn unavailable() -> Self {
        Self {
            tree: Tree::new(),
            investigated_files: Vec::new(),
            dim_counts: BTreeMap::new(),
            files_scanned: 0,
            total_findings: 0,
            critical: 0,
            warnings: 0,
            clean_files: 0,
            recon_available: false,
            scanned_at: 0,
            quarantined: 0,
        }
    }
}

impl Default for ReconSnapshot {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Request/response collaborator that owns the scanner output and the investigated set.
pub trait ReconTransport {
    fn snapshot(&mut self) -> Result<ReconSnapshot, TransportError>;

    fn set_investigated(
        &mut self,
        path: &str,
        action: InvestigateAction,
    ) -> Result<(), TransportError>;

    fn clear_investigated(&mut self) -> Result<(), TransportError>;

    /// An empty result means the line is not available upstream.
    fn source_line(
        &mut self,
        file: &str,
        line: u32,
        context: u32,
    ) -> Result<Vec<SourceLine>, TransportError>;

    fn investigated_files(&mut self) -> Result<Vec<String>, TransportError> {
        Ok(self.snapshot()?.investigated_files)
    }
}

/// Key-value persistence for the filter `active` map and the investigated mirror.
pub trait StateStore {
    fn load_filter(&mut self) -> Result<Option<BTreeMap<String, bool>>, PersistError>;

    fn save_filter(&mut self, active: &BTreeMap<String, bool>) -> Result<(), PersistError>;

    fn load_investigated_mirror(&mut self) -> Result<Option<Vec<String>>, PersistError>;

    fn save_investigated_mirror(&mut self, paths: &[String]) -> Result<(), PersistError>;
}

/// Volatile store for embedding without persistence.
#[derive(Clone, Debug, Default)]
pub struct MemoryStateStore {
    pub filter: Option<BTreeMap<String, bool>>,
    pub investigated: Option<Vec<String>>,
    pub writes: usize,
}

impl StateStore for MemoryStateStore {
    fn load_filter(&mut self) -> Result<Option<BTreeMap<String, bool>>, PersistError> {
        Ok(self.filter.clone())
    }

    fn save_filter(&mut self, active: &BTreeMap<String, bool>) -> Result<(), PersistError> {
        self.filter = Some(active.clone());
        self.writes += 1;
        Ok(())
    }

    fn load_investigated_mirror(&mut self) -> Result<Option<Vec<String>>, PersistError> {
        Ok(self.investigated.clone())
    }

    fn save_investigated_mirror(&mut self, paths: &[String]) -> Result<(), PersistError> {
        self.investigated = Some(paths.to_vec());
        self.writes += 1;
        Ok(())
    }
}
