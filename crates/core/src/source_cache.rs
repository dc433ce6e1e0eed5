#![forbid(unsafe_code)]

use crate::error::TransportError;
use crate::transport::{ReconTransport, SourceLine};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    pub file: String,
    pub line: u32,
}

impl LineKey {
    pub fn new(file: &str, line: u32) -> Self {
        Self {
            file: file.to_string(),
            line,
        }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineLookup {
    Ready(String),
    Pending,
    Unavailable,
}

/// Issued once per key on a miss. The holder performs the fetch and hands the
/// result back through [`SourceLineCache::complete`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: LineKey,
    pub epoch: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Slot {
    Pending,
    Ready(String),
    Unavailable,
}

/// Single-line source text keyed by `file:line`, single-flight per key.
///
/// Navigating to another file or folder discards everything: line numbers only mean
/// something inside the file they were fetched for.
#[derive(Debug, Default)]
pub struct SourceLineCache {
    scope: Option<String>,
    epoch: u64,
    slots: HashMap<LineKey, Slot>,
    fetches_issued: u64,
}

impl SourceLineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the move invalidated the cache.
    pub fn navigate(&mut self, scope_key: &str) -> bool {
        if self.scope.as_deref() == Some(scope_key) {
            return false;
        }
        self.scope = Some(scope_key.to_string());
        self.invalidate();
        true
    }

    pub fn invalidate(&mut self) {
        if !self.slots.is_empty() {
            debug!(entries = self.slots.len(), epoch = self.epoch, "source cache cleared");
        }
        self.slots.clear();
        self.epoch += 1;
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn fetches_issued(&self) -> u64 {
        self.fetches_issued
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Cached text, if any. Never issues a fetch.
    pub fn text(&self, file: &str, line: u32) -> Option<&str> {
        match self.slots.get(&LineKey::new(file, line)) {
            Some(Slot::Ready(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn get(&mut self, file: &str, line: u32) -> (LineLookup, Option<FetchTicket>) {
        let key = LineKey::new(file, line);
        match self.slots.get(&key) {
            Some(Slot::Ready(text)) => (LineLookup::Ready(text.clone()), None),
            Some(Slot::Unavailable) => (LineLookup::Unavailable, None),
            Some(Slot::Pending) => (LineLookup::Pending, None),
            None => {
                self.slots.insert(key.clone(), Slot::Pending);
                self.fetches_issued += 1;
                let ticket = FetchTicket {
                    key,
                    epoch: self.epoch,
                };
                (LineLookup::Pending, Some(ticket))
            }
        }
    }

    /// Applies a fetch result. Last writer wins; a ticket from an earlier epoch still
    /// writes, its entry is simply never looked up again.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<SourceLine>, TransportError>,
    ) -> LineLookup {
        if ticket.epoch != self.epoch {
            debug!(key = %ticket.key, "stale source line fetch completed");
        }
        let slot = match result {
            Ok(lines) => match lines.into_iter().next() {
                Some(line) => Slot::Ready(line.content),
                None => Slot::Unavailable,
            },
            Err(err) => {
                debug!(key = %ticket.key, %err, "source line fetch failed");
                Slot::Unavailable
            }
        };
        let lookup = match &slot {
            Slot::Ready(text) => LineLookup::Ready(text.clone()),
            Slot::Unavailable | Slot::Pending => LineLookup::Unavailable,
        };
        self.slots.insert(ticket.key, slot);
        lookup
    }

    /// Synchronous get-or-fetch through `transport`.
    pub fn fetch_through<T: ReconTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        file: &str,
        line: u32,
    ) -> LineLookup {
        match self.get(file, line) {
            (_, Some(ticket)) => {
                let result = transport.source_line(file, line, 0);
                self.complete(ticket, result)
            }
            (lookup, None) => lookup,
        }
    }
}
