#![forbid(unsafe_code)]

//! Snapshot wire format written by the scanner: `folder -> file -> info`, plus summary
//! counters. Every finding is checked against the taxonomy here; the engine only ever
//! sees validated data.

use rv_core::{
    FileNode, Finding, INVESTIGATED_DIM, INVESTIGATED_TIER, PACKAGE_LEVEL, ROOT_FOLDER,
    ReconSnapshot, Severity, Taxonomy, TransportError, Tree,
};
use serde::Deserialize;
use sha2::Digest as _;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub(crate) struct WireSnapshot {
    #[serde(default)]
    pub files_scanned: Option<usize>,
    #[serde(default)]
    pub total_findings: Option<usize>,
    #[serde(default)]
    pub critical: Option<usize>,
    #[serde(default)]
    pub warnings: Option<usize>,
    #[serde(default)]
    pub clean_files: Option<usize>,
    #[serde(default)]
    pub dim_counts: Option<BTreeMap<String, usize>>,
    #[serde(default)]
    pub tree: BTreeMap<String, BTreeMap<String, WireFileInfo>>,
    #[serde(default)]
    pub investigated_files: Option<Vec<String>>,
    #[serde(default)]
    pub recon_available: Option<bool>,
    #[serde(default)]
    pub scanned_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireFileInfo {
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Kept untyped so one malformed finding is quarantined instead of failing the file.
    #[serde(default)]
    pub findings: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireFinding {
    #[serde(default)]
    pub symbol: String,
    pub dim_id: String,
    pub tier_id: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub severity: String,
    pub line: i64,
}

#[derive(Debug)]
pub(crate) struct Decoded {
    pub snapshot: ReconSnapshot,
    pub digest: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Rejection {
    Shape(String),
    Taxonomy(String),
    Severity(String),
    Line(i64),
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for b in digest {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub(crate) fn decode_snapshot(
    bytes: &[u8],
    taxonomy: &Taxonomy,
) -> Result<Decoded, TransportError> {
    let wire: WireSnapshot =
        serde_json::from_slice(bytes).map_err(|err| TransportError::Decode(err.to_string()))?;
    Ok(Decoded {
        snapshot: validate(wire, taxonomy),
        digest: sha256_hex(bytes),
    })
}

fn validate(wire: WireSnapshot, taxonomy: &Taxonomy) -> ReconSnapshot {
    let mut tree = Tree::new();
    let mut quarantined = 0usize;

    for (folder, files) in wire.tree {
        let folder = if folder.trim().is_empty() {
            ROOT_FOLDER.to_string()
        } else {
            folder
        };
        for (file, info) in files {
            let mut findings = Vec::with_capacity(info.findings.len());
            for raw in info.findings {
                match accept(raw, taxonomy) {
                    Ok(finding) => findings.push(finding),
                    Err(rejection) => {
                        quarantined += 1;
                        warn!(folder = %folder, file = %file, ?rejection, "finding quarantined");
                    }
                }
            }
            tree.insert(
                &folder,
                &file,
                FileNode {
                    findings,
                    symbols: info.symbols,
                },
            );
        }
    }

    let recounted = Counters::from_tree(&tree);
    ReconSnapshot {
        dim_counts: wire.dim_counts.unwrap_or(recounted.dim_counts),
        files_scanned: wire.files_scanned.unwrap_or(recounted.files),
        total_findings: wire.total_findings.unwrap_or(recounted.total),
        critical: wire.critical.unwrap_or(recounted.critical),
        warnings: wire.warnings.unwrap_or(recounted.warnings),
        clean_files: wire.clean_files.unwrap_or(recounted.clean),
        investigated_files: wire.investigated_files.unwrap_or_default(),
        recon_available: wire.recon_available.unwrap_or(true),
        scanned_at: wire.scanned_at.unwrap_or(0),
        quarantined,
        tree,
    }
}

fn accept(raw: serde_json::Value, taxonomy: &Taxonomy) -> Result<Finding, Rejection> {
    let raw: WireFinding =
        serde_json::from_value(raw).map_err(|err| Rejection::Shape(err.to_string()))?;
    // the investigated overlay is derived from review marks, never reported by the scanner
    if raw.tier_id == INVESTIGATED_TIER || raw.dim_id == INVESTIGATED_DIM {
        return Err(Rejection::Taxonomy(format!(
            "{}/{} is reserved for review marks",
            raw.tier_id, raw.dim_id
        )));
    }
    taxonomy
        .classify(&raw.tier_id, &raw.dim_id)
        .map_err(|err| Rejection::Taxonomy(err.to_string()))?;
    let severity =
        Severity::parse(&raw.severity).ok_or_else(|| Rejection::Severity(raw.severity.clone()))?;
    let line = u32::try_from(raw.line)
        .ok()
        .filter(|line| *line > 0)
        .ok_or(Rejection::Line(raw.line))?;

    let id = if raw.id.trim().is_empty() {
        raw.dim_id.clone()
    } else {
        raw.id
    };
    let label = if raw.label.trim().is_empty() {
        id.clone()
    } else {
        raw.label
    };
    let symbol = if raw.symbol.trim().is_empty() {
        PACKAGE_LEVEL.to_string()
    } else {
        raw.symbol
    };
    Ok(Finding {
        id,
        tier_id: raw.tier_id,
        dim_id: raw.dim_id,
        severity,
        line,
        symbol,
        label,
        investigated: false,
    })
}

#[derive(Default)]
struct Counters {
    dim_counts: BTreeMap<String, usize>,
    files: usize,
    clean: usize,
    total: usize,
    critical: usize,
    warnings: usize,
}

impl Counters {
    fn from_tree(tree: &Tree) -> Self {
        let mut out = Self::default();
        for (_, _, node) in tree.files() {
            out.files += 1;
            if node.findings.is_empty() {
                out.clean += 1;
            }
            for finding in &node.findings {
                out.total += 1;
                *out.dim_counts.entry(finding.dim_id.clone()).or_default() += 1;
                match finding.severity {
                    Severity::Critical => out.critical += 1,
                    Severity::Warning => out.warnings += 1,
                    Severity::Info => {}
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "files_scanned": 3,
      "tree": {
        ".": {
          "main.go": {
            "language": "go",
            "symbols": ["main"],
            "findings": [
              {"symbol": "", "dim_id": "debug", "tier_id": "observability", "id": "", "label": "", "severity": "info", "line": 4}
            ]
          }
        },
        "internal/store": {
          "db.go": {
            "language": "go",
            "symbols": ["Open", "Query"],
            "findings": [
              {"symbol": "Query", "dim_id": "injection", "tier_id": "security", "id": "sql_concat", "label": "SQL built by concatenation", "severity": "critical", "line": 42},
              {"symbol": "Open", "dim_id": "errors", "tier_id": "quality", "id": "ignored_error", "label": "Ignored error", "severity": "warning", "line": 12},
              {"symbol": "Open", "dim_id": "injection", "tier_id": "quality", "id": "x", "label": "wrong tier", "severity": "warning", "line": 13},
              {"symbol": "Open", "dim_id": "errors", "tier_id": "quality", "id": "y", "label": "bad severity", "severity": "high", "line": 14},
              {"symbol": "Open", "dim_id": "errors", "tier_id": "quality", "id": "z", "label": "bad line", "severity": "warning", "line": 0},
              {"symbol": "Open", "dim_id": "nope", "tier_id": "quality", "id": "w", "label": "unknown dim", "severity": "warning", "line": 9},
              {"symbol": "Open", "dim_id": "investigated", "tier_id": "investigated", "id": "v", "label": "claims review", "severity": "warning", "line": 10}
            ]
          },
          "clean.go": {"language": "go", "symbols": [], "findings": []}
        }
      }
    }"#;

    #[test]
    fn invalid_findings_are_quarantined() {
        let decoded = decode_snapshot(SAMPLE.as_bytes(), &Taxonomy::builtin()).expect("decode");
        let snapshot = decoded.snapshot;
        assert_eq!(snapshot.quarantined, 5);
        assert_eq!(snapshot.tree.finding_count(), 3);
        let db = snapshot.tree.file("internal/store", "db.go").expect("db.go");
        assert_eq!(db.findings.len(), 2);
        assert_eq!(db.symbols, vec!["Open".to_string(), "Query".to_string()]);
    }

    #[test]
    fn malformed_finding_does_not_fail_the_file() {
        let bytes = br#"{"tree": {"pkg": {"a.go": {"findings": [
          {"dim_id": "errors", "tier_id": "quality", "severity": "warning", "line": 3},
          {"dim_id": "errors", "tier_id": "quality", "line": 5},
          {"dim_id": "errors", "tier_id": "quality", "severity": "warning", "line": "7"},
          "not an object"
        ]}}}}"#;
        let snapshot = decode_snapshot(bytes, &Taxonomy::builtin())
            .expect("decode")
            .snapshot;
        assert_eq!(snapshot.quarantined, 3);
        let file = snapshot.tree.file("pkg", "a.go").expect("a.go");
        assert_eq!(file.findings.len(), 1);
        assert_eq!(file.findings[0].line, 3);
        assert_eq!(snapshot.total_findings, 1);
    }

    #[test]
    fn missing_fields_are_normalized() {
        let decoded = decode_snapshot(SAMPLE.as_bytes(), &Taxonomy::builtin()).expect("decode");
        let main = decoded.snapshot.tree.file(".", "main.go").expect("main.go");
        let finding = &main.findings[0];
        assert_eq!(finding.symbol, PACKAGE_LEVEL);
        assert_eq!(finding.id, "debug");
        assert_eq!(finding.label, "debug");
        assert_eq!(finding.severity, Severity::Info);
    }

    #[test]
    fn omitted_counters_are_recounted() {
        let snapshot = decode_snapshot(SAMPLE.as_bytes(), &Taxonomy::builtin())
            .expect("decode")
            .snapshot;
        assert_eq!(snapshot.files_scanned, 3);
        assert_eq!(snapshot.total_findings, 3);
        assert_eq!(snapshot.critical, 1);
        assert_eq!(snapshot.warnings, 1);
        assert_eq!(snapshot.clean_files, 1);
        assert_eq!(snapshot.dim_counts.get("injection"), Some(&1));
        assert!(snapshot.recon_available);
        assert!(snapshot.investigated_files.is_empty());
    }

    #[test]
    fn unavailable_flag_is_carried() {
        let snapshot = decode_snapshot(br#"{"recon_available": false}"#, &Taxonomy::builtin())
            .expect("decode")
            .snapshot;
        assert!(!snapshot.recon_available);
        assert!(snapshot.tree.is_empty());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = decode_snapshot(b"{\"tree\": [", &Taxonomy::builtin()).expect_err("bad json");
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn digest_tracks_raw_bytes() {
        let a = decode_snapshot(br#"{"tree": {}}"#, &Taxonomy::builtin()).expect("decode");
        let b = decode_snapshot(br#"{"tree": {} }"#, &Taxonomy::builtin()).expect("decode");
        assert_eq!(a.digest.len(), 64);
        assert_ne!(a.digest, b.digest);
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
