#![forbid(unsafe_code)]

use crate::model::{Finding, Severity};
use crate::source_cache::SourceLineCache;
use crate::taxonomy::Taxonomy;
use std::collections::{BTreeMap, BTreeSet};

pub const PROMPT_TEXT_MAX_CHARS: usize = 160;

const CLOSING_INSTRUCTION: &str = "For each line above, either fix the issue or justify why the code is correct as written. State which you chose per line.";

pub fn sanitize_single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect::<String>()
}

pub fn truncate_for_prompt(text: &str, max_chars: usize) -> String {
    let sanitized = sanitize_single_line(text).trim().to_string();
    if sanitized.chars().count() <= max_chars {
        return sanitized;
    }
    let mut out = String::new();
    for (i, ch) in sanitized.chars().enumerate() {
        if i >= max_chars.saturating_sub(1) {
            break;
        }
        out.push(ch);
    }
    out.push('\u{2026}');
    out
}

/// Builds the remediation request for one file from its visible findings.
///
/// Output depends only on the inputs: findings are ordered by line (ties keep input
/// order), tiers by registry order, severities by rank.
pub fn compose_prompt(
    taxonomy: &Taxonomy,
    file_path: &str,
    findings: &[Finding],
    cache: &SourceLineCache,
) -> Option<String> {
    if findings.is_empty() {
        return None;
    }

    let mut sorted = findings.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|finding| finding.line);

    let mut severities_by_tier: BTreeMap<&str, BTreeSet<Severity>> = BTreeMap::new();
    for finding in &sorted {
        severities_by_tier
            .entry(finding.tier_id.as_str())
            .or_default()
            .insert(finding.severity);
    }

    let mut lines = vec![format!("Recon findings in {file_path}:")];

    lines.push("Legend:".to_string());
    for tier in taxonomy.list_tiers() {
        let Some(severities) = severities_by_tier.remove(tier.id.as_str()) else {
            continue;
        };
        lines.push(format!(
            "{} = {} ({})",
            tier.abbrev,
            tier.label,
            join_severities(&severities)
        ));
    }
    // tiers the registry does not know about keep a usable legend entry
    for (tier_id, severities) in &severities_by_tier {
        lines.push(format!(
            "{} = {} ({})",
            fallback_abbrev(tier_id),
            tier_id,
            join_severities(severities)
        ));
    }

    for finding in &sorted {
        let abbrev = taxonomy
            .abbreviation(&finding.tier_id)
            .map(str::to_string)
            .unwrap_or_else(|_| fallback_abbrev(&finding.tier_id));
        let text = cache
            .text(file_path, finding.line)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(finding.label.as_str());
        lines.push(format!(
            "{file_path}:{} [{abbrev} {}] {}",
            finding.line,
            finding.severity.as_str(),
            truncate_for_prompt(text, PROMPT_TEXT_MAX_CHARS)
        ));
    }

    lines.push(CLOSING_INSTRUCTION.to_string());

    let mut symbols: Vec<&str> = Vec::new();
    for finding in &sorted {
        if finding.is_package_level() || symbols.contains(&finding.symbol.as_str()) {
            continue;
        }
        symbols.push(finding.symbol.as_str());
    }
    if !symbols.is_empty() {
        lines.push(format!(
            "Symbols touched: {}. Check their callers and propagate any change in behavior or signature.",
            symbols.join(", ")
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Some(out)
}

fn join_severities(severities: &BTreeSet<Severity>) -> String {
    severities
        .iter()
        .map(|sev| sev.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn fallback_abbrev(tier_id: &str) -> String {
    tier_id.to_ascii_uppercase()
}
