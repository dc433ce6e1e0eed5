#![forbid(unsafe_code)]

use crate::error::TaxonomyError;
use std::collections::{HashMap, HashSet};

/// Tier holding the pseudo-dimension that drives the investigated overlay.
pub const INVESTIGATED_TIER: &str = "investigated";
pub const INVESTIGATED_DIM: &str = "investigated";

const MAX_ID_LEN: usize = 64;
const MAX_ABBREV_LEN: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub id: String,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tier {
    pub id: String,
    pub label: String,
    /// Compact column header. Derived from the id when left empty.
    pub abbrev: String,
    pub dimensions: Vec<Dimension>,
    pub default_off: bool,
}

impl Tier {
    pub fn dimension_ids(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|dim| dim.id.as_str())
    }

    pub fn has_dimension(&self, dim_id: &str) -> bool {
        self.dimensions.iter().any(|dim| dim.id == dim_id)
    }
}

/// Ordered tier → dimension registry. Immutable once built.
#[derive(Clone, Debug)]
pub struct Taxonomy {
    tiers: Vec<Tier>,
    dim_index: HashMap<String, usize>,
}

impl Taxonomy {
    pub fn try_new(mut tiers: Vec<Tier>) -> Result<Self, TaxonomyError> {
        if tiers.is_empty() {
            return Err(TaxonomyError::Empty);
        }
        let mut tier_ids = HashSet::new();
        let mut dim_ids = HashSet::new();
        for tier in &mut tiers {
            validate_id(&tier.id)?;
            if !tier_ids.insert(tier.id.clone()) {
                return Err(TaxonomyError::DuplicateTier(tier.id.clone()));
            }
            if tier.label.trim().is_empty() {
                tier.label = tier.id.clone();
            }
            if tier.abbrev.trim().is_empty() {
                tier.abbrev = derive_abbrev(&tier.id);
            }
            for dim in &mut tier.dimensions {
                validate_id(&dim.id)?;
                if !dim_ids.insert(dim.id.clone()) {
                    return Err(TaxonomyError::DuplicateDimension(dim.id.clone()));
                }
                if dim.label.trim().is_empty() {
                    dim.label = dim.id.clone();
                }
            }
        }
        Ok(Self::index(tiers))
    }

    pub fn builtin() -> Self {
        Self::index(vec![
            tier(
                "security",
                "Security",
                "SEC",
                &[
                    ("secrets", "Secrets"),
                    ("injection", "Injection"),
                    ("crypto", "Crypto"),
                    ("transport", "Transport"),
                    ("exposure", "Exposure"),
                    ("config", "Config"),
                    ("data", "Data handling"),
                    ("denial", "Denial of service"),
                ],
                false,
            ),
            tier(
                "performance",
                "Performance",
                "PERF",
                &[
                    ("resources", "Resources"),
                    ("concurrency", "Concurrency"),
                    ("memory", "Memory"),
                    ("hot_path", "Hot path"),
                ],
                false,
            ),
            tier(
                "quality",
                "Quality",
                "QUAL",
                &[
                    ("errors", "Error handling"),
                    ("complexity", "Complexity"),
                    ("dead_code", "Dead code"),
                    ("conventions", "Conventions"),
                ],
                false,
            ),
            tier(
                "observability",
                "Observability",
                "OBS",
                &[
                    ("debug", "Debug leftovers"),
                    ("logging", "Logging"),
                    ("silent_failure", "Silent failure"),
                ],
                false,
            ),
            tier(
                "architecture",
                "Architecture",
                "ARCH",
                &[
                    ("antipattern", "Anti-patterns"),
                    ("imports", "Imports"),
                    ("api_surface", "API surface"),
                ],
                false,
            ),
            tier(
                INVESTIGATED_TIER,
                "Investigated",
                "INV",
                &[(INVESTIGATED_DIM, "Investigated")],
                true,
            ),
        ])
    }

    fn index(tiers: Vec<Tier>) -> Self {
        let mut dim_index = HashMap::new();
        for (idx, tier) in tiers.iter().enumerate() {
            for dim in &tier.dimensions {
                dim_index.insert(dim.id.clone(), idx);
            }
        }
        Self { tiers, dim_index }
    }

    pub fn list_tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier(&self, tier_id: &str) -> Result<&Tier, TaxonomyError> {
        self.tiers
            .iter()
            .find(|tier| tier.id == tier_id)
            .ok_or_else(|| TaxonomyError::UnknownTier(tier_id.to_string()))
    }

    pub fn dimension_tier(&self, dim_id: &str) -> Result<&Tier, TaxonomyError> {
        self.dim_index
            .get(dim_id)
            .map(|idx| &self.tiers[*idx])
            .ok_or_else(|| TaxonomyError::UnknownDimension(dim_id.to_string()))
    }

    pub fn abbreviation(&self, tier_id: &str) -> Result<&str, TaxonomyError> {
        self.tier(tier_id).map(|tier| tier.abbrev.as_str())
    }

    pub fn dimension_ids(&self) -> impl Iterator<Item = &str> {
        self.tiers.iter().flat_map(|tier| tier.dimension_ids())
    }

    /// Checks that `dim_id` exists and is declared under `tier_id`.
    pub fn classify(&self, tier_id: &str, dim_id: &str) -> Result<&Tier, TaxonomyError> {
        let tier = self.tier(tier_id)?;
        let owner = self.dimension_tier(dim_id)?;
        if owner.id != tier.id {
            return Err(TaxonomyError::TierMismatch {
                tier: tier_id.to_string(),
                dim: dim_id.to_string(),
            });
        }
        Ok(tier)
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

fn tier(id: &str, label: &str, abbrev: &str, dims: &[(&str, &str)], default_off: bool) -> Tier {
    Tier {
        id: id.to_string(),
        label: label.to_string(),
        abbrev: abbrev.to_string(),
        dimensions: dims
            .iter()
            .map(|(id, label)| Dimension {
                id: id.to_string(),
                label: label.to_string(),
            })
            .collect(),
        default_off,
    }
}

fn validate_id(value: &str) -> Result<(), TaxonomyError> {
    let ok = !value.is_empty()
        && value.len() <= MAX_ID_LEN
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(TaxonomyError::InvalidId(value.to_string()))
    }
}

fn derive_abbrev(id: &str) -> String {
    id.chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .take(MAX_ABBREV_LEN)
        .collect::<String>()
        .to_ascii_uppercase()
}
