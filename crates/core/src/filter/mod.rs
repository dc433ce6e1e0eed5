#![forbid(unsafe_code)]

use crate::error::TaxonomyError;
use crate::model::Severity;
use crate::taxonomy::Taxonomy;
use std::collections::BTreeMap;

/// Severity focus. `Recon` is the default view and hides `info`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Recon,
    Critical,
    Warning,
    Info,
    All,
}

impl Focus {
    pub fn as_str(self) -> &'static str {
        match self {
            Focus::Recon => "recon",
            Focus::Critical => "critical",
            Focus::Warning => "warning",
            Focus::Info => "info",
            Focus::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "recon" => Some(Focus::Recon),
            "critical" => Some(Focus::Critical),
            "warning" => Some(Focus::Warning),
            "info" => Some(Focus::Info),
            "all" => Some(Focus::All),
            _ => None,
        }
    }

    pub fn admits(self, severity: Severity) -> bool {
        match self {
            Focus::Recon => severity != Severity::Info,
            Focus::Critical => severity == Severity::Critical,
            Focus::Warning => severity == Severity::Warning,
            Focus::Info => severity == Severity::Info,
            Focus::All => true,
        }
    }
}

/// User-controlled visibility over the taxonomy.
///
/// Every dimension of the taxonomy it was built from has an entry in `active`.
/// Only the `active` map is persisted; `focus` and `source_on` are view flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterState {
    active: BTreeMap<String, bool>,
    focus: Focus,
    source_on: bool,
}

impl FilterState {
    pub fn defaults(taxonomy: &Taxonomy) -> Self {
        let mut active = BTreeMap::new();
        for tier in taxonomy.list_tiers() {
            for dim_id in tier.dimension_ids() {
                active.insert(dim_id.to_string(), !tier.default_off);
            }
        }
        Self {
            active,
            focus: Focus::default(),
            source_on: false,
        }
    }

    /// Overlays a persisted map on the defaults. Unknown ids are dropped.
    pub fn restore(taxonomy: &Taxonomy, stored: &BTreeMap<String, bool>) -> Self {
        let mut state = Self::defaults(taxonomy);
        for (dim_id, on) in stored {
            if let Some(slot) = state.active.get_mut(dim_id) {
                *slot = *on;
            }
        }
        state
    }

    pub fn active_map(&self) -> &BTreeMap<String, bool> {
        &self.active
    }

    pub fn is_active(&self, dim_id: &str) -> bool {
        self.active.get(dim_id).copied().unwrap_or(false)
    }

    /// Returns the new state of the dimension.
    pub fn toggle_dimension(
        &mut self,
        taxonomy: &Taxonomy,
        dim_id: &str,
    ) -> Result<bool, TaxonomyError> {
        taxonomy.dimension_tier(dim_id)?;
        let slot = self.active.entry(dim_id.to_string()).or_insert(false);
        *slot = !*slot;
        Ok(*slot)
    }

    /// A tier is "on" while any of its dimensions is. Toggling an on tier switches every
    /// dimension off; toggling an off tier switches every dimension on.
    pub fn toggle_tier(
        &mut self,
        taxonomy: &Taxonomy,
        tier_id: &str,
    ) -> Result<bool, TaxonomyError> {
        let tier = taxonomy.tier(tier_id)?;
        let next = !tier.dimension_ids().any(|dim_id| self.is_active(dim_id));
        for dim_id in tier.dimension_ids() {
            self.active.insert(dim_id.to_string(), next);
        }
        Ok(next)
    }

    pub fn solo_tier(&mut self, taxonomy: &Taxonomy, tier_id: &str) -> Result<(), TaxonomyError> {
        let tier = taxonomy.tier(tier_id)?;
        for slot in self.active.values_mut() {
            *slot = false;
        }
        for dim_id in tier.dimension_ids() {
            self.active.insert(dim_id.to_string(), true);
        }
        Ok(())
    }

    /// Unknown tiers are reported inactive.
    pub fn is_tier_active(&self, taxonomy: &Taxonomy, tier_id: &str) -> bool {
        taxonomy
            .tier(tier_id)
            .map(|tier| tier.dimension_ids().any(|dim_id| self.is_active(dim_id)))
            .unwrap_or(false)
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
    }

    pub fn source_on(&self) -> bool {
        self.source_on
    }

    pub fn set_source_on(&mut self, on: bool) {
        self.source_on = on;
    }

    /// Back to `recon` focus with source view off.
    pub fn reset_view_flags(&mut self) {
        self.focus = Focus::default();
        self.source_on = false;
    }
}
