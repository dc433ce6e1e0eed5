#![forbid(unsafe_code)]

use crate::error::TransportError;
use crate::transport::ReconTransport;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// File paths (`folder/file`) marked as reviewed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvestigatedSet {
    paths: BTreeSet<String>,
}

impl InvestigatedSet {
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(Into::into)
                .map(|path: String| path.trim().to_string())
                .filter(|path| !path.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.paths.iter().cloned().collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvestigateAction {
    Add,
    Remove,
}

impl InvestigateAction {
    pub fn as_str(self) -> &'static str {
        match self {
            InvestigateAction::Add => "add",
            InvestigateAction::Remove => "remove",
        }
    }
}

/// Read-only mirror of the transport-owned investigated set.
///
/// Writes go to the transport first; the mirror only changes after an acknowledged
/// round-trip.
#[derive(Clone, Debug, Default)]
pub struct InvestigatedState {
    mirror: InvestigatedSet,
}

impl InvestigatedState {
    pub fn new(mirror: InvestigatedSet) -> Self {
        Self { mirror }
    }

    pub fn mirror(&self) -> &InvestigatedSet {
        &self.mirror
    }

    pub fn replace(&mut self, mirror: InvestigatedSet) {
        self.mirror = mirror;
    }

    pub fn mark<T: ReconTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        path: &str,
        investigated: bool,
    ) -> Result<(), TransportError> {
        let action = if investigated {
            InvestigateAction::Add
        } else {
            InvestigateAction::Remove
        };
        transport.set_investigated(path, action)?;
        info!(path, action = action.as_str(), "investigated state acknowledged");
        self.refresh_after_ack(transport, |paths| {
            match action {
                InvestigateAction::Add => paths.insert(path.to_string()),
                InvestigateAction::Remove => paths.remove(path),
            };
        });
        Ok(())
    }

    pub fn clear_all<T: ReconTransport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        transport.clear_investigated()?;
        info!("investigated state cleared");
        self.refresh_after_ack(transport, |paths| paths.clear());
        Ok(())
    }

    /// Re-reads the authoritative set. If that read fails the acknowledged change is
    /// applied locally instead.
    fn refresh_after_ack<T, F>(&mut self, transport: &mut T, acked: F)
    where
        T: ReconTransport + ?Sized,
        F: FnOnce(&mut BTreeSet<String>),
    {
        match transport.investigated_files() {
            Ok(paths) => self.mirror = InvestigatedSet::from_paths(paths),
            Err(err) => {
                warn!(%err, "investigated refresh failed; applying acknowledged change");
                acked(&mut self.mirror.paths);
            }
        }
    }
}
