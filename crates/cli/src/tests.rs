#![forbid(unsafe_code)]

use super::*;
use rv_core::Focus;
use std::path::{Path, PathBuf};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = base.join(format!("rv_cli_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

const SNAPSHOT: &str = r#"{
  "scanned_at": 1700000000,
  "tree": {
    ".": {
      "main.go": {
        "symbols": ["main"],
        "findings": [
          {"symbol": "main", "dim_id": "debug", "tier_id": "observability", "id": "println", "label": "Debug print", "severity": "info", "line": 3}
        ]
      }
    },
    "internal/store": {
      "db.go": {
        "symbols": ["Open", "Query"],
        "findings": [
          {"symbol": "Query", "dim_id": "injection", "tier_id": "security", "id": "sql_concat", "label": "SQL built by concatenation", "severity": "critical", "line": 2},
          {"symbol": "Open", "dim_id": "errors", "tier_id": "quality", "id": "ignored_error", "label": "Ignored error", "severity": "warning", "line": 1}
        ]
      }
    }
  }
}"#;

struct Fixture {
    dir: PathBuf,
}

impl Fixture {
    fn new(test_name: &str) -> Self {
        let dir = temp_dir(test_name);
        std::fs::create_dir_all(dir.join("internal").join("store")).expect("mkdir");
        std::fs::write(
            dir.join("internal").join("store").join("db.go"),
            "_ = conn.Close()\nrows, _ := db.Query(\"SELECT * FROM t WHERE id=\" + id)\n",
        )
        .expect("write source");
        std::fs::write(dir.join("snapshot.json"), SNAPSHOT).expect("write snapshot");
        Self { dir }
    }

    fn config(&self, extra: &[&str]) -> Config {
        let storage = self.dir.join(".rv");
        let snapshot = self.dir.join("snapshot.json");
        let mut list = vec![
            "--storage-dir".to_string(),
            path_arg(&storage),
            "--snapshot".to_string(),
            path_arg(&snapshot),
            "--root".to_string(),
            path_arg(&self.dir),
        ];
        list.extend(args(extra));
        parse_args(&list).expect("parse args")
    }

    fn run(&self, extra: &[&str]) -> String {
        let cfg = self.config(extra);
        let mut out = Vec::new();
        run(&cfg, &mut out).expect("run");
        String::from_utf8(out).expect("utf8 output")
    }

    fn run_json(&self, extra: &[&str]) -> Value {
        let mut list = vec!["--json"];
        list.extend_from_slice(extra);
        serde_json::from_str(&self.run(&list)).expect("json output")
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn parse_defaults_to_root_view() {
    let cfg = parse_args(&args(&["--storage-dir", "/tmp/rv-test"])).expect("parse");
    assert_eq!(cfg.command, Command::View { scope: None });
    assert_eq!(cfg.storage_dir, PathBuf::from("/tmp/rv-test"));
    assert!(!cfg.json);
    assert_eq!(cfg.focus, None);
}

#[test]
fn parse_flags_and_command() {
    let cfg = parse_args(&args(&[
        "--storage-dir",
        "/tmp/rv-test",
        "--snapshot",
        "/tmp/recon.json",
        "--focus",
        "critical",
        "--source",
        "--json",
        "-v",
        "--interval-ms",
        "5",
        "drill",
        "security",
        "internal/store",
    ]))
    .expect("parse");
    assert_eq!(cfg.snapshot, PathBuf::from("/tmp/recon.json"));
    assert_eq!(cfg.focus, Some(Focus::Critical));
    assert!(cfg.source && cfg.json && cfg.verbose);
    assert_eq!(cfg.interval_ms, 100);
    assert_eq!(
        cfg.command,
        Command::Drill {
            tier: "security".to_string(),
            scope: Some("internal/store".to_string()),
        }
    );
}

#[test]
fn parse_rejects_bad_input() {
    assert!(parse_args(&args(&["--bogus"])).is_err());
    assert!(parse_args(&args(&["--focus", "loud"])).is_err());
    assert!(parse_args(&args(&["--storage-dir"])).is_err());
    assert!(parse_args(&args(&["frobnicate"])).is_err());
    assert!(parse_args(&args(&["source", "a.go", "0"])).is_err());
    assert!(parse_args(&args(&["toggle-dim"])).is_err());
    assert!(parse_args(&args(&["tiers", "extra"])).is_err());
    assert_eq!(
        parse_args(&args(&["source", "a.go", "7"])).expect("parse").command,
        Command::Source {
            path: "a.go".to_string(),
            line: 7,
        }
    );
    assert_eq!(
        parse_args(&args(&["--help"])).expect("parse").command,
        Command::Help
    );
}

#[test]
fn root_view_renders_folders() {
    let fixture = Fixture::new("root_view_renders_folders");
    let text = fixture.run(&["view"]);
    assert!(text.contains("recon: 3 findings in 2 files"));
    assert!(text.contains("scope: (root)  visible 2  risk 35 (medium)"));
    assert!(text.contains("internal/store"));
}

#[test]
fn missing_snapshot_renders_unavailable() {
    let fixture = Fixture::new("missing_snapshot_renders_unavailable");
    std::fs::remove_file(fixture.dir.join("snapshot.json")).expect("remove snapshot");
    assert_eq!(
        fixture.run(&["view", "internal/store"]),
        "recon not available: no scanner snapshot yet\n"
    );
}

#[test]
fn unknown_scope_is_an_error() {
    let fixture = Fixture::new("unknown_scope_is_an_error");
    let cfg = fixture.config(&["view", "nowhere"]);
    let err = run(&cfg, &mut std::io::sink()).expect_err("unknown scope");
    assert!(matches!(err, CliError::UnknownScope(_)));
}

#[test]
fn filter_changes_persist_between_runs() {
    let fixture = Fixture::new("filter_changes_persist_between_runs");
    fixture.run(&["toggle-tier", "security"]);

    let value = fixture.run_json(&["view"]);
    assert_eq!(value["aggregate"]["total"], 1);
    assert_eq!(value["aggregate"]["by_tier"]["security"], Value::Null);

    let tiers = fixture.run_json(&["tiers"]);
    assert_eq!(tiers["tiers"][0]["state"], "off");
}

#[test]
fn file_view_with_focus_and_source() {
    let fixture = Fixture::new("file_view_with_focus_and_source");
    let value = fixture.run_json(&["--source", "--focus", "all", "view", "internal/store/db.go"]);
    assert_eq!(value["scope"]["level"], "file");
    let findings = value["findings"].as_array().expect("findings");
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0]["line"], 1);
    assert_eq!(findings[0]["source"], "_ = conn.Close()");

    let critical = fixture.run_json(&["--focus", "critical", "view", "internal/store/db.go"]);
    assert_eq!(critical["findings"].as_array().map(Vec::len), Some(1));
}

#[test]
fn investigated_file_leaves_the_totals() {
    let fixture = Fixture::new("investigated_file_leaves_the_totals");
    let text = fixture.run(&["investigate", "internal/store/db.go"]);
    assert_eq!(text, "investigated: internal/store/db.go\n");

    let value = fixture.run_json(&["view"]);
    assert_eq!(value["aggregate"]["total"], 0);
    assert_eq!(value["aggregate"]["investigated"], 2);
    assert_eq!(value["investigated_files"][0], "internal/store/db.go");

    fixture.run(&["clear-investigated"]);
    assert_eq!(fixture.run_json(&["view"])["aggregate"]["total"], 2);
}

#[test]
fn drill_solos_the_tier() {
    let fixture = Fixture::new("drill_solos_the_tier");
    let value = fixture.run_json(&["drill", "quality", "internal/store"]);
    assert_eq!(value["scope"]["path"], "internal/store");
    assert_eq!(value["aggregate"]["total"], 1);
    assert_eq!(value["aggregate"]["by_tier"]["quality"], 1);
}

#[test]
fn prompt_uses_source_text() {
    let fixture = Fixture::new("prompt_uses_source_text");
    let prompt = fixture.run(&["prompt", "internal/store/db.go"]);
    assert!(prompt.starts_with("Recon findings in internal/store/db.go:\n"));
    assert!(prompt.contains(
        "internal/store/db.go:2 [SEC critical] rows, _ := db.Query(\"SELECT * FROM t WHERE id=\" + id)"
    ));
    assert!(prompt.contains("Symbols touched: Open, Query."));

    let cfg = fixture.config(&["prompt", "internal/store"]);
    assert!(matches!(
        run(&cfg, &mut std::io::sink()),
        Err(CliError::NotAFile(_))
    ));
}

#[test]
fn source_command_reads_one_line() {
    let fixture = Fixture::new("source_command_reads_one_line");
    assert_eq!(
        fixture.run(&["source", "internal/store/db.go", "1"]),
        "_ = conn.Close()\n"
    );
    assert_eq!(
        fixture.run(&["source", "internal/store/db.go", "99"]),
        "(source unavailable)\n"
    );
}

#[test]
fn watch_renders_only_on_change() {
    let fixture = Fixture::new("watch_renders_only_on_change");
    let cfg = fixture.config(&["watch"]);
    let mut session = open_session(&cfg).expect("open session");
    let mut state = WatchState::default();
    let mut out = Vec::new();

    assert!(state.tick(&mut session, &cfg, None, &mut out).expect("tick"));
    assert!(!state.tick(&mut session, &cfg, None, &mut out).expect("tick"));

    let changed = SNAPSHOT.replace("\"line\": 3", "\"line\": 4");
    std::fs::write(fixture.dir.join("snapshot.json"), changed).expect("rewrite snapshot");
    assert!(state.tick(&mut session, &cfg, None, &mut out).expect("tick"));

    let text = String::from_utf8(out).expect("utf8");
    assert_eq!(text.matches("---\n").count(), 2);
}
