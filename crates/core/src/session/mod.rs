#![forbid(unsafe_code)]

use crate::aggregate::{Aggregate, RiskScore, Rollup, aggregate, children};
use crate::error::{TaxonomyError, TransportError};
use crate::filter::{FilterState, Focus};
use crate::investigated::{InvestigatedSet, InvestigatedState};
use crate::model::{Finding, Level, Scope, file_path};
use crate::predicate::is_visible;
use crate::prompt::compose_prompt;
use crate::source_cache::{LineLookup, SourceLineCache};
use crate::taxonomy::Taxonomy;
use crate::transport::{ReconSnapshot, ReconTransport, StateStore};
use tracing::{debug, warn};

/// Aggregates for the current scope, ready for a renderer to diff against the previous one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconView {
    pub scope: Scope,
    pub aggregate: Aggregate,
    pub risk: RiskScore,
    pub children: Vec<Rollup>,
    pub recon_available: bool,
    pub generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub tree_changed: bool,
    /// The scope vanished from the new tree and navigation fell back to root.
    pub scope_reset: bool,
}

/// Owns every piece of mutable recon state and serializes changes to it.
pub struct ReconSession<T, S> {
    taxonomy: Taxonomy,
    filter: FilterState,
    snapshot: ReconSnapshot,
    investigated: InvestigatedState,
    cache: SourceLineCache,
    scope: Scope,
    transport: T,
    store: S,
    generation: u64,
}

impl<T: ReconTransport, S: StateStore> ReconSession<T, S> {
    /// Restores persisted state. Store failures fall back to taxonomy defaults.
    pub fn open(taxonomy: Taxonomy, transport: T, mut store: S) -> Self {
        let filter = match store.load_filter() {
            Ok(Some(stored)) => FilterState::restore(&taxonomy, &stored),
            Ok(None) => FilterState::defaults(&taxonomy),
            Err(err) => {
                warn!(%err, "filter state unreadable; using defaults");
                FilterState::defaults(&taxonomy)
            }
        };
        let mirror = match store.load_investigated_mirror() {
            Ok(paths) => InvestigatedSet::from_paths(paths.unwrap_or_default()),
            Err(err) => {
                warn!(%err, "investigated mirror unreadable");
                InvestigatedSet::default()
            }
        };
        let mut cache = SourceLineCache::new();
        cache.navigate(&Scope::Root.key());
        Self {
            taxonomy,
            filter,
            snapshot: ReconSnapshot::unavailable(),
            investigated: InvestigatedState::new(mirror),
            cache,
            scope: Scope::Root,
            transport,
            store,
            generation: 0,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn snapshot(&self) -> &ReconSnapshot {
        &self.snapshot
    }

    pub fn investigated(&self) -> &InvestigatedSet {
        self.investigated.mirror()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn cache(&self) -> &SourceLineCache {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Polls a fresh snapshot. On failure nothing changes.
    pub fn refresh(&mut self) -> Result<RefreshOutcome, TransportError> {
        let mut snapshot = self.transport.snapshot()?;
        let mirror = InvestigatedSet::from_paths(snapshot.investigated_files.iter().cloned());
        snapshot.tree.apply_investigated(&mirror);
        let tree_changed = snapshot.tree != self.snapshot.tree;
        self.investigated.replace(mirror);
        self.snapshot = snapshot;
        self.persist_mirror();

        if tree_changed {
            self.cache.invalidate();
        }
        let scope_reset = !self.scope.exists_in(&self.snapshot.tree);
        if scope_reset {
            debug!(scope = %self.scope.path(), "scope left the tree");
            self.navigate(Scope::Root);
        }
        self.bump();
        Ok(RefreshOutcome {
            tree_changed,
            scope_reset,
        })
    }

    pub fn navigate(&mut self, scope: Scope) {
        if self.scope.level() == Level::File && scope.level() != Level::File {
            self.filter.reset_view_flags();
        }
        self.cache.navigate(&scope.key());
        self.scope = scope;
        self.bump();
    }

    pub fn toggle_dimension(&mut self, dim_id: &str) -> Result<bool, TaxonomyError> {
        let on = self.filter.toggle_dimension(&self.taxonomy, dim_id)?;
        self.persist_filter();
        Ok(on)
    }

    pub fn toggle_tier(&mut self, tier_id: &str) -> Result<bool, TaxonomyError> {
        let on = self.filter.toggle_tier(&self.taxonomy, tier_id)?;
        self.persist_filter();
        Ok(on)
    }

    pub fn solo_tier(&mut self, tier_id: &str) -> Result<(), TaxonomyError> {
        self.filter.solo_tier(&self.taxonomy, tier_id)?;
        self.persist_filter();
        Ok(())
    }

    /// Clicking a roll-up count: isolate the tier and move to the row's scope.
    pub fn drill_tier(&mut self, tier_id: &str, scope: Scope) -> Result<(), TaxonomyError> {
        self.solo_tier(tier_id)?;
        self.navigate(scope);
        Ok(())
    }

    pub fn is_tier_active(&self, tier_id: &str) -> bool {
        self.filter.is_tier_active(&self.taxonomy, tier_id)
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.filter.set_focus(focus);
        self.bump();
    }

    pub fn set_source_on(&mut self, on: bool) {
        self.filter.set_source_on(on);
        self.bump();
    }

    pub fn mark_investigated(
        &mut self,
        path: &str,
        investigated: bool,
    ) -> Result<(), TransportError> {
        self.investigated
            .mark(&mut self.transport, path, investigated)?;
        self.after_investigated_change();
        Ok(())
    }

    pub fn clear_investigated(&mut self) -> Result<(), TransportError> {
        self.investigated.clear_all(&mut self.transport)?;
        self.after_investigated_change();
        Ok(())
    }

    pub fn view(&self) -> ReconView {
        let tree = &self.snapshot.tree;
        let aggregate = aggregate(tree, &self.scope, &self.filter);
        let risk = aggregate.risk();
        ReconView {
            scope: self.scope.clone(),
            children: children(tree, &self.scope, &self.filter),
            aggregate,
            risk,
            recon_available: self.snapshot.recon_available,
            generation: self.generation,
        }
    }

    /// Visible findings of one file, by ascending line.
    pub fn visible_findings(&self, folder: &str, file: &str) -> Vec<Finding> {
        let Some(node) = self.snapshot.tree.file(folder, file) else {
            return Vec::new();
        };
        let mut out = node
            .findings
            .iter()
            .filter(|finding| is_visible(finding, &self.filter))
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by_key(|finding| finding.line);
        out
    }

    pub fn source_line(&mut self, path: &str, line: u32) -> LineLookup {
        self.cache.fetch_through(&mut self.transport, path, line)
    }

    /// Fills source-line gaps for the file's visible findings, then composes.
    pub fn compose_prompt(&mut self, folder: &str, file: &str) -> Option<String> {
        let findings = self.visible_findings(folder, file);
        if findings.is_empty() {
            return None;
        }
        let path = file_path(folder, file);
        for finding in &findings {
            self.cache
                .fetch_through(&mut self.transport, &path, finding.line);
        }
        compose_prompt(&self.taxonomy, &path, &findings, &self.cache)
    }

    fn after_investigated_change(&mut self) {
        self.snapshot
            .tree
            .apply_investigated(self.investigated.mirror());
        self.snapshot.investigated_files = self.investigated.mirror().to_vec();
        self.persist_mirror();
        self.bump();
    }

    fn persist_filter(&mut self) {
        if let Err(err) = self.store.save_filter(self.filter.active_map()) {
            warn!(%err, "filter state not persisted");
        }
        self.bump();
    }

    fn persist_mirror(&mut self) {
        let paths = self.investigated.mirror().to_vec();
        if let Err(err) = self.store.save_investigated_mirror(&paths) {
            warn!(%err, "investigated mirror not persisted");
        }
    }

    fn bump(&mut self) {
        self.generation += 1;
    }
}
