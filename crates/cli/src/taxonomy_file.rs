#![forbid(unsafe_code)]

use crate::error::CliError;
use rv_core::{Dimension, INVESTIGATED_DIM, INVESTIGATED_TIER, Taxonomy, Tier};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaxonomyYaml {
    tiers: Vec<TierYaml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TierYaml {
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    abbrev: String,
    #[serde(default)]
    default_off: bool,
    dimensions: Vec<DimensionYaml>,
}

/// `- secrets` or `- { id: secrets, label: Secrets }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DimensionYaml {
    Bare(String),
    Full {
        id: String,
        #[serde(default)]
        label: String,
    },
}

impl From<DimensionYaml> for Dimension {
    fn from(value: DimensionYaml) -> Self {
        match value {
            DimensionYaml::Bare(id) => Dimension {
                id,
                label: String::new(),
            },
            DimensionYaml::Full { id, label } => Dimension { id, label },
        }
    }
}

pub(crate) fn load_taxonomy(path: &Path) -> Result<Taxonomy, CliError> {
    let text = std::fs::read_to_string(path)?;
    parse_taxonomy(&text).map_err(|err| match err {
        ParseError::Yaml(source) => CliError::TaxonomyFile {
            path: path.to_path_buf(),
            source,
        },
        ParseError::Taxonomy(err) => CliError::Taxonomy(err),
    })
}

enum ParseError {
    Yaml(serde_yaml::Error),
    Taxonomy(rv_core::TaxonomyError),
}

/// A file that leaves out the investigated tier gets the built-in one appended, so the
/// overlay keeps working.
fn parse_taxonomy(text: &str) -> Result<Taxonomy, ParseError> {
    let parsed: TaxonomyYaml = serde_yaml::from_str(text).map_err(ParseError::Yaml)?;
    let mut tiers = parsed
        .tiers
        .into_iter()
        .map(|tier| Tier {
            id: tier.id.trim().to_string(),
            label: tier.label,
            abbrev: tier.abbrev,
            default_off: tier.default_off,
            dimensions: tier.dimensions.into_iter().map(Dimension::from).collect(),
        })
        .collect::<Vec<_>>();

    let has_overlay = tiers
        .iter()
        .any(|tier| tier.id == INVESTIGATED_TIER || tier.has_dimension(INVESTIGATED_DIM));
    if !tiers.is_empty() && !has_overlay {
        let builtin = Taxonomy::builtin();
        if let Ok(tier) = builtin.tier(INVESTIGATED_TIER) {
            tiers.push(tier.clone());
        }
    }
    Taxonomy::try_new(tiers).map_err(ParseError::Taxonomy)
}
