#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_STORE_DIRNAME: &str = ".rv";
pub(crate) const DEFAULT_SNAPSHOT_FILE: &str = "recon.json";

pub(crate) fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Sources are read relative to the repo root, not the launch directory.
pub(crate) fn default_root_from_start(start: &Path) -> PathBuf {
    find_repo_root(start).unwrap_or_else(|| start.to_path_buf())
}

pub(crate) fn default_storage_dir_from_start(start: &Path) -> PathBuf {
    default_root_from_start(start).join(DEFAULT_STORE_DIRNAME)
}

pub(crate) fn default_snapshot_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join(DEFAULT_SNAPSHOT_FILE)
}

fn start_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub(crate) fn default_storage_dir() -> PathBuf {
    default_storage_dir_from_start(&start_dir())
}

pub(crate) fn default_root() -> PathBuf {
    default_root_from_start(&start_dir())
}
