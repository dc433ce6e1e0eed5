#![forbid(unsafe_code)]

use crate::filter::FilterState;
use crate::model::{FileNode, Finding, PACKAGE_LEVEL, Scope, Severity, Tree};
use crate::predicate::{Visibility, visibility};
use std::collections::BTreeMap;

pub const CRITICAL_WEIGHT: u32 = 25;
pub const WARNING_WEIGHT: u32 = 10;
pub const INFO_WEIGHT: u32 = 0;
pub const MAX_RISK_SCORE: u32 = 100;
pub const HIGH_RISK_THRESHOLD: u32 = 40;
pub const MEDIUM_RISK_THRESHOLD: u32 = 15;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.warning + self.info
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskClass {
    Low,
    Medium,
    High,
}

impl RiskClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskClass::Low => "low",
            RiskClass::Medium => "medium",
            RiskClass::High => "high",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiskScore {
    pub score: u32,
    pub class: RiskClass,
}

impl RiskScore {
    pub fn from_counts(counts: &SeverityCounts) -> Self {
        let weigh = |count: usize, weight: u32| {
            u32::try_from(count)
                .unwrap_or(u32::MAX)
                .saturating_mul(weight)
        };
        let score = weigh(counts.critical, CRITICAL_WEIGHT)
            .saturating_add(weigh(counts.warning, WARNING_WEIGHT))
            .saturating_add(weigh(counts.info, INFO_WEIGHT))
            .min(MAX_RISK_SCORE);
        let class = if score >= HIGH_RISK_THRESHOLD {
            RiskClass::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            RiskClass::Medium
        } else {
            RiskClass::Low
        };
        Self { score, class }
    }
}

/// Roll-up of the visible findings under one scope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Aggregate {
    /// Visible findings per tier; tiers with no visible finding are absent.
    pub by_tier: BTreeMap<String, usize>,
    pub by_severity: SeverityCounts,
    pub total: usize,
    /// Investigated findings currently hidden because the overlay is off. Zero while the
    /// overlay is on. Not part of `total`.
    pub investigated: usize,
}

impl Aggregate {
    pub fn risk(&self) -> RiskScore {
        RiskScore::from_counts(&self.by_severity)
    }

    pub fn tier_count(&self, tier_id: &str) -> usize {
        self.by_tier.get(tier_id).copied().unwrap_or(0)
    }

    fn fold(&mut self, finding: &Finding, filter: &FilterState) {
        match visibility(finding, filter) {
            Visibility::Visible => {
                *self.by_tier.entry(finding.tier_id.clone()).or_insert(0) += 1;
                self.by_severity.bump(finding.severity);
                self.total += 1;
            }
            Visibility::HiddenByOverlay => self.investigated += 1,
            _ => {}
        }
    }

    fn fold_file(&mut self, node: &FileNode, filter: &FilterState) {
        for finding in &node.findings {
            self.fold(finding, filter);
        }
    }
}

pub fn aggregate(tree: &Tree, scope: &Scope, filter: &FilterState) -> Aggregate {
    let mut out = Aggregate::default();
    for (folder, file, node) in tree.files() {
        if scope.contains(folder, file) {
            out.fold_file(node, filter);
        }
    }
    out
}

/// One sibling row under a scope: a folder, a file, or a symbol group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rollup {
    pub name: String,
    /// Navigation target; symbol rows have none.
    pub scope: Option<Scope>,
    pub aggregate: Aggregate,
    pub risk: RiskScore,
}

impl Rollup {
    fn new(name: &str, scope: Option<Scope>, aggregate: Aggregate) -> Self {
        let risk = aggregate.risk();
        Self {
            name: name.to_string(),
            scope,
            aggregate,
            risk,
        }
    }
}

/// Children of `scope`, sorted by descending visible total. Ties keep tree order.
pub fn children(tree: &Tree, scope: &Scope, filter: &FilterState) -> Vec<Rollup> {
    let mut rows = match scope {
        Scope::Root => tree
            .folders()
            .iter()
            .map(|folder| {
                let mut agg = Aggregate::default();
                for entry in &folder.files {
                    agg.fold_file(&entry.node, filter);
                }
                Rollup::new(&folder.name, Some(Scope::Folder(folder.name.clone())), agg)
            })
            .collect::<Vec<_>>(),
        Scope::Folder(name) => match tree.folder(name) {
            Some(folder) => folder
                .files
                .iter()
                .map(|entry| {
                    let mut agg = Aggregate::default();
                    agg.fold_file(&entry.node, filter);
                    Rollup::new(&entry.name, Some(Scope::file(name, &entry.name)), agg)
                })
                .collect(),
            None => Vec::new(),
        },
        Scope::File { folder, file } => match tree.file(folder, file) {
            Some(node) => symbol_groups(node)
                .into_iter()
                .map(|(symbol, findings)| {
                    let mut agg = Aggregate::default();
                    for finding in findings {
                        agg.fold(finding, filter);
                    }
                    Rollup::new(&symbol, None, agg)
                })
                .collect(),
            None => Vec::new(),
        },
    };
    rows.sort_by(|a, b| b.aggregate.total.cmp(&a.aggregate.total));
    rows
}

/// Findings grouped by symbol: declared symbols first (declaration order), then
/// undeclared names in order of appearance, then the package-level group.
fn symbol_groups(node: &FileNode) -> Vec<(String, Vec<&Finding>)> {
    let mut groups: Vec<(String, Vec<&Finding>)> = node
        .symbols
        .iter()
        .map(|symbol| (symbol.clone(), Vec::new()))
        .collect();
    let mut package_level = Vec::new();
    for finding in &node.findings {
        if finding.is_package_level() {
            package_level.push(finding);
            continue;
        }
        match groups.iter_mut().find(|(name, _)| *name == finding.symbol) {
            Some((_, members)) => members.push(finding),
            None => groups.push((finding.symbol.clone(), vec![finding])),
        }
    }
    groups.retain(|(_, members)| !members.is_empty());
    if !package_level.is_empty() {
        groups.push((PACKAGE_LEVEL.to_string(), package_level));
    }
    groups
}

#[cfg(test)]
mod tests;
