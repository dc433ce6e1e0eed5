#![forbid(unsafe_code)]

use rv_core::{
    Aggregate, FilterState, Finding, INVESTIGATED_TIER, Level, ReconSnapshot, ReconView,
    RiskScore, Rollup, Scope, Taxonomy, truncate_for_prompt,
};
use serde_json::{Value, json};
use std::fmt::Write as _;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const SOURCE_MAX_CHARS: usize = 120;

/// A visible finding of the file in view, with its source line when one was fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FindingRow {
    pub finding: Finding,
    pub source: Option<String>,
}

pub(crate) fn scanned_at_rfc3339(unix_seconds: i64) -> Option<String> {
    if unix_seconds <= 0 {
        return None;
    }
    OffsetDateTime::from_unix_timestamp(unix_seconds)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

fn scope_label(scope: &Scope) -> String {
    match scope {
        Scope::Root => "(root)".to_string(),
        other => other.path(),
    }
}

/// The investigated cell shows the population hidden behind the overlay, not a tier count.
fn tier_cells(taxonomy: &Taxonomy, aggregate: &Aggregate) -> String {
    taxonomy
        .list_tiers()
        .iter()
        .map(|tier| {
            let count = if tier.id == INVESTIGATED_TIER {
                aggregate.investigated
            } else {
                aggregate.tier_count(&tier.id)
            };
            format!("{} {}", tier.abbrev, count)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn risk_cell(risk: &RiskScore) -> String {
    format!("{} ({})", risk.score, risk.class.as_str())
}

pub(crate) fn view_text(
    taxonomy: &Taxonomy,
    snapshot: &ReconSnapshot,
    view: &ReconView,
    rows: &[FindingRow],
) -> String {
    let mut out = String::new();
    if !view.recon_available {
        out.push_str("recon not available: no scanner snapshot yet\n");
        return out;
    }

    let _ = write!(
        out,
        "recon: {} findings in {} files ({} critical, {} warnings, {} clean)",
        snapshot.total_findings,
        snapshot.files_scanned,
        snapshot.critical,
        snapshot.warnings,
        snapshot.clean_files
    );
    if let Some(at) = scanned_at_rfc3339(snapshot.scanned_at) {
        let _ = write!(out, ", scanned {at}");
    }
    out.push('\n');
    if snapshot.quarantined > 0 {
        let _ = writeln!(out, "quarantined: {} findings", snapshot.quarantined);
    }

    let _ = writeln!(
        out,
        "scope: {}  visible {}  risk {}",
        scope_label(&view.scope),
        view.aggregate.total,
        risk_cell(&view.risk)
    );
    let _ = writeln!(out, "  {}", tier_cells(taxonomy, &view.aggregate));

    if !view.children.is_empty() {
        let width = view
            .children
            .iter()
            .map(|row| row.name.chars().count())
            .max()
            .unwrap_or(0);
        out.push('\n');
        for row in &view.children {
            let _ = writeln!(
                out,
                "  {:<width$}  {:>4}  risk {:<12}  {}",
                row.name,
                row.aggregate.total,
                risk_cell(&row.risk),
                tier_cells(taxonomy, &row.aggregate),
            );
        }
    }

    if view.scope.level() == Level::File && !rows.is_empty() {
        out.push('\n');
        for row in rows {
            let finding = &row.finding;
            let abbrev = taxonomy
                .abbreviation(&finding.tier_id)
                .unwrap_or(finding.tier_id.as_str());
            let _ = write!(
                out,
                "  {:>5}  {:<4} {:<8}  {}  [{}]",
                finding.line,
                abbrev,
                finding.severity.as_str(),
                finding.label,
                finding.symbol
            );
            if finding.investigated {
                out.push_str("  (investigated)");
            }
            out.push('\n');
            if let Some(source) = &row.source {
                let _ = writeln!(
                    out,
                    "         | {}",
                    truncate_for_prompt(source, SOURCE_MAX_CHARS)
                );
            }
        }
    }
    out
}

fn aggregate_json(aggregate: &Aggregate) -> Value {
    let risk = aggregate.risk();
    json!({
        "total": aggregate.total,
        "by_tier": aggregate.by_tier,
        "by_severity": {
            "critical": aggregate.by_severity.critical,
            "warning": aggregate.by_severity.warning,
            "info": aggregate.by_severity.info,
        },
        "investigated": aggregate.investigated,
        "risk": { "score": risk.score, "class": risk.class.as_str() },
    })
}

fn rollup_json(row: &Rollup) -> Value {
    json!({
        "name": row.name,
        "scope": row.scope.as_ref().map(Scope::path),
        "aggregate": aggregate_json(&row.aggregate),
    })
}

fn finding_json(row: &FindingRow) -> Value {
    let finding = &row.finding;
    json!({
        "id": finding.id,
        "tier_id": finding.tier_id,
        "dim_id": finding.dim_id,
        "severity": finding.severity.as_str(),
        "line": finding.line,
        "symbol": finding.symbol,
        "label": finding.label,
        "investigated": finding.investigated,
        "source": row.source,
    })
}

pub(crate) fn view_json(snapshot: &ReconSnapshot, view: &ReconView, rows: &[FindingRow]) -> Value {
    if !view.recon_available {
        return json!({ "recon_available": false });
    }
    let level = match view.scope.level() {
        Level::Root => "root",
        Level::Folder => "folder",
        Level::File => "file",
    };
    json!({
        "recon_available": true,
        "scanned_at": scanned_at_rfc3339(snapshot.scanned_at),
        "summary": {
            "files_scanned": snapshot.files_scanned,
            "total_findings": snapshot.total_findings,
            "critical": snapshot.critical,
            "warnings": snapshot.warnings,
            "clean_files": snapshot.clean_files,
            "dim_counts": snapshot.dim_counts,
            "quarantined": snapshot.quarantined,
        },
        "scope": {
            "level": level,
            "path": view.scope.path(),
        },
        "aggregate": aggregate_json(&view.aggregate),
        "children": view.children.iter().map(rollup_json).collect::<Vec<_>>(),
        "findings": rows.iter().map(finding_json).collect::<Vec<_>>(),
        "investigated_files": snapshot.investigated_files,
    })
}

fn tier_state(taxonomy: &Taxonomy, filter: &FilterState, tier_id: &str) -> &'static str {
    let Ok(tier) = taxonomy.tier(tier_id) else {
        return "off";
    };
    let on = tier
        .dimension_ids()
        .filter(|dim| filter.is_active(dim))
        .count();
    if on == 0 {
        "off"
    } else if on == tier.dimensions.len() {
        "on"
    } else {
        "partial"
    }
}

pub(crate) fn tiers_text(taxonomy: &Taxonomy, filter: &FilterState) -> String {
    let mut out = String::new();
    for tier in taxonomy.list_tiers() {
        let _ = writeln!(
            out,
            "{:<5} {:<16} {:<8} {}",
            tier.abbrev,
            tier.id,
            tier_state(taxonomy, filter, &tier.id),
            tier.label
        );
        for dim in &tier.dimensions {
            let mark = if filter.is_active(&dim.id) { "x" } else { " " };
            let _ = writeln!(out, "      [{mark}] {:<16} {}", dim.id, dim.label);
        }
    }
    out
}

pub(crate) fn tiers_json(taxonomy: &Taxonomy, filter: &FilterState) -> Value {
    let tiers = taxonomy
        .list_tiers()
        .iter()
        .map(|tier| {
            json!({
                "id": tier.id,
                "label": tier.label,
                "abbrev": tier.abbrev,
                "default_off": tier.default_off,
                "state": tier_state(taxonomy, filter, &tier.id),
                "dimensions": tier.dimensions.iter().map(|dim| json!({
                    "id": dim.id,
                    "label": dim.label,
                    "active": filter.is_active(&dim.id),
                })).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();
    json!({ "tiers": tiers })
}
