#![forbid(unsafe_code)]

use crate::wire::decode_snapshot;
use rv_core::{
    InvestigateAction, ReconSnapshot, ReconTransport, SourceLine, Taxonomy, TransportError,
};
use rv_storage::{SqliteStore, StoreError, now_ms};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::debug;

/// Local transport: the scanner's snapshot file, the source tree, and the investigated
/// marks in SQLite.
pub(crate) struct FileTransport {
    snapshot_path: PathBuf,
    root: Option<PathBuf>,
    taxonomy: Taxonomy,
    store: SqliteStore,
    last_digest: Option<String>,
}

impl FileTransport {
    pub(crate) fn new(
        snapshot_path: PathBuf,
        root: Option<PathBuf>,
        taxonomy: Taxonomy,
        store: SqliteStore,
    ) -> Self {
        Self {
            snapshot_path,
            root,
            taxonomy,
            store,
            last_digest: None,
        }
    }

    /// SHA-256 of the last snapshot file read, if one was read.
    pub(crate) fn last_digest(&self) -> Option<&str> {
        self.last_digest.as_deref()
    }

    /// Live marks. A mark whose file changed after it was set no longer holds.
    fn live_marks(&mut self) -> Result<Vec<String>, TransportError> {
        let marks = self
            .store
            .investigated_list(now_ms())
            .map_err(store_error)?;
        let mut out = Vec::with_capacity(marks.len());
        for mark in marks {
            let modified = self
                .root
                .as_deref()
                .and_then(|root| modified_ms(&root.join(&mark.path)));
            if modified.is_some_and(|modified| modified > mark.marked_at_ms) {
                debug!(path = %mark.path, "file edited since it was investigated");
                self.store
                    .investigated_unmark(&mark.path)
                    .map_err(store_error)?;
                continue;
            }
            out.push(mark.path);
        }
        Ok(out)
    }
}

impl ReconTransport for FileTransport {
    fn snapshot(&mut self) -> Result<ReconSnapshot, TransportError> {
        let bytes = match std::fs::read(&self.snapshot_path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.snapshot_path.display(), "no snapshot yet");
                self.last_digest = None;
                let mut snapshot = ReconSnapshot::unavailable();
                snapshot.investigated_files = self.live_marks()?;
                return Ok(snapshot);
            }
            Err(err) => {
                return Err(TransportError::Unavailable(format!(
                    "{}: {err}",
                    self.snapshot_path.display()
                )));
            }
        };
        let decoded = decode_snapshot(&bytes, &self.taxonomy)?;
        let mut snapshot = decoded.snapshot;
        snapshot.investigated_files = self.live_marks()?;
        self.last_digest = Some(decoded.digest);
        Ok(snapshot)
    }

    fn set_investigated(
        &mut self,
        path: &str,
        action: InvestigateAction,
    ) -> Result<(), TransportError> {
        match action {
            InvestigateAction::Add => self.store.investigated_mark(path, now_ms()),
            InvestigateAction::Remove => self.store.investigated_unmark(path).map(|_| ()),
        }
        .map_err(store_error)
    }

    fn clear_investigated(&mut self) -> Result<(), TransportError> {
        let cleared = self.store.investigated_clear().map_err(store_error)?;
        debug!(cleared, "investigated marks cleared");
        Ok(())
    }

    fn source_line(
        &mut self,
        file: &str,
        line: u32,
        context: u32,
    ) -> Result<Vec<SourceLine>, TransportError> {
        let Some(root) = self.root.as_deref() else {
            return Ok(Vec::new());
        };
        if !is_relative_inside(file) {
            return Err(TransportError::Rejected(format!(
                "{file}: path escapes the source root"
            )));
        }
        let bytes = match std::fs::read(root.join(file)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(TransportError::Unavailable(format!("{file}: {err}"))),
        };
        Ok(window(&String::from_utf8_lossy(&bytes), line, context))
    }

    fn investigated_files(&mut self) -> Result<Vec<String>, TransportError> {
        self.live_marks()
    }
}

/// Lines `line - context ..= line + context` (1-based), clipped to the file.
fn window(text: &str, line: u32, context: u32) -> Vec<SourceLine> {
    if line == 0 {
        return Vec::new();
    }
    let first = line.saturating_sub(context).max(1) as usize;
    let last = line.saturating_add(context) as usize;
    text.lines()
        .enumerate()
        .map(|(idx, content)| (idx + 1, content))
        .skip_while(|(number, _)| *number < first)
        .take_while(|(number, _)| *number <= last)
        .map(|(_, content)| SourceLine {
            content: content.to_string(),
        })
        .collect()
}

fn is_relative_inside(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

fn modified_ms(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let since = modified.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(since.as_millis()).ok()
}

fn store_error(err: StoreError) -> TransportError {
    match err {
        StoreError::InvalidInput(message) => TransportError::Rejected(message.to_string()),
        other => TransportError::Unavailable(other.to_string()),
    }
}
