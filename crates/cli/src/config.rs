#![forbid(unsafe_code)]

use crate::defaults::{default_root, default_snapshot_path, default_storage_dir};
use rv_core::Focus;
use std::path::PathBuf;

const DEFAULT_INTERVAL_MS: u64 = 2_000;
const MIN_INTERVAL_MS: u64 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    View { scope: Option<String> },
    Tiers,
    ToggleDimension { dim: String },
    ToggleTier { tier: String },
    Solo { tier: String },
    Drill { tier: String, scope: Option<String> },
    Investigate { path: String },
    Uninvestigate { path: String },
    ClearInvestigated,
    Prompt { path: String },
    Source { path: String, line: u32 },
    Watch { scope: Option<String> },
}

#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub storage_dir: PathBuf,
    pub snapshot: PathBuf,
    pub root: PathBuf,
    pub taxonomy: Option<PathBuf>,
    pub focus: Option<Focus>,
    pub source: bool,
    pub json: bool,
    pub interval_ms: u64,
    pub verbose: bool,
    pub quiet: bool,
    pub no_color: bool,
    pub command: Command,
}

pub(crate) fn usage() -> &'static str {
    "rv - recon findings viewer\n\n\
USAGE:\n\
  rv [OPTIONS] <COMMAND>\n\n\
COMMANDS:\n\
  view [SCOPE]            roll-up for root, a folder, or a file (default)\n\
  tiers                   taxonomy with the active state of every dimension\n\
  toggle-dim DIM          flip one dimension\n\
  toggle-tier TIER        all dimensions of a tier on or off\n\
  solo TIER               show only TIER\n\
  drill TIER [SCOPE]      solo TIER and view SCOPE\n\
  investigate PATH        mark a file as reviewed\n\
  uninvestigate PATH      drop the reviewed mark\n\
  clear-investigated      drop every reviewed mark\n\
  prompt PATH             remediation prompt for the visible findings of a file\n\
  source PATH LINE        one source line\n\
  watch [SCOPE]           re-render whenever the snapshot changes\n\n\
OPTIONS:\n\
  --storage-dir DIR   state directory (env RV_STORAGE_DIR, default <repo>/.rv)\n\
  --snapshot FILE     scanner output (env RV_SNAPSHOT, default <storage-dir>/recon.json)\n\
  --root DIR          source root (env RV_ROOT, default <repo>)\n\
  --taxonomy FILE     YAML taxonomy (env RV_TAXONOMY, default built-in)\n\
  --focus F           recon|critical|warning|info|all (file views)\n\
  --source            show source text next to findings (file views)\n\
  --json              machine-readable output\n\
  --interval-ms MS    watch poll interval (default 2000)\n\
  -v, --verbose       debug logs on stderr (RV_LOG / RUST_LOG override)\n\
  -q, --quiet         errors only\n\
  --no-color          no ANSI colors in logs\n"
}

pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses everything after the program name.
pub(crate) fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut storage_dir: Option<PathBuf> = env_var("RV_STORAGE_DIR").map(PathBuf::from);
    let mut snapshot: Option<PathBuf> = env_var("RV_SNAPSHOT").map(PathBuf::from);
    let mut root: Option<PathBuf> = env_var("RV_ROOT").map(PathBuf::from);
    let mut taxonomy: Option<PathBuf> = env_var("RV_TAXONOMY").map(PathBuf::from);
    let mut focus: Option<Focus> = None;
    let mut source = false;
    let mut json = false;
    let mut interval_ms = DEFAULT_INTERVAL_MS;
    let mut verbose = false;
    let mut quiet = false;
    let mut no_color = false;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0usize;
    while i < args.len() {
        let a = args[i].as_str();
        match a {
            "-h" | "--help" => positional = vec!["help".to_string()],
            "--storage-dir" => {
                i += 1;
                let v = args.get(i).ok_or("--storage-dir requires DIR")?;
                storage_dir = Some(PathBuf::from(v));
            }
            "--snapshot" => {
                i += 1;
                let v = args.get(i).ok_or("--snapshot requires FILE")?;
                snapshot = Some(PathBuf::from(v));
            }
            "--root" => {
                i += 1;
                let v = args.get(i).ok_or("--root requires DIR")?;
                root = Some(PathBuf::from(v));
            }
            "--taxonomy" => {
                i += 1;
                let v = args.get(i).ok_or("--taxonomy requires FILE")?;
                taxonomy = Some(PathBuf::from(v));
            }
            "--focus" => {
                i += 1;
                let v = args.get(i).ok_or("--focus requires F")?;
                focus = Some(
                    Focus::parse(v)
                        .ok_or("--focus must be one of recon|critical|warning|info|all")?,
                );
            }
            "--interval-ms" => {
                i += 1;
                let v = args.get(i).ok_or("--interval-ms requires MS")?;
                interval_ms = v
                    .parse::<u64>()
                    .map_err(|_| "--interval-ms must be an integer (milliseconds)")?
                    .max(MIN_INTERVAL_MS);
            }
            "--source" => source = true,
            "--json" => json = true,
            "-v" | "--verbose" => verbose = true,
            "-q" | "--quiet" => quiet = true,
            "--no-color" => no_color = true,
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(format!("Unknown arg: {other}\n\n{}", usage()));
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let command = parse_command(&positional)?;
    let storage_dir = storage_dir.unwrap_or_else(default_storage_dir);
    let snapshot = snapshot.unwrap_or_else(|| default_snapshot_path(&storage_dir));
    let root = root.unwrap_or_else(default_root);

    Ok(Config {
        storage_dir,
        snapshot,
        root,
        taxonomy,
        focus,
        source,
        json,
        interval_ms,
        verbose,
        quiet,
        no_color,
        command,
    })
}

fn parse_command(positional: &[String]) -> Result<Command, String> {
    let Some((name, rest)) = positional.split_first() else {
        return Ok(Command::View { scope: None });
    };
    let arg = |idx: usize, what: &str| -> Result<String, String> {
        rest.get(idx)
            .cloned()
            .ok_or_else(|| format!("{name} requires {what}"))
    };
    let optional = |idx: usize| rest.get(idx).cloned();
    let max_args = |n: usize| -> Result<(), String> {
        if rest.len() > n {
            return Err(format!("{name}: unexpected argument {:?}", rest[n]));
        }
        Ok(())
    };

    let command = match name.as_str() {
        "help" => Command::Help,
        "view" => {
            max_args(1)?;
            Command::View { scope: optional(0) }
        }
        "tiers" => {
            max_args(0)?;
            Command::Tiers
        }
        "toggle-dim" => {
            max_args(1)?;
            Command::ToggleDimension {
                dim: arg(0, "DIM")?,
            }
        }
        "toggle-tier" => {
            max_args(1)?;
            Command::ToggleTier {
                tier: arg(0, "TIER")?,
            }
        }
        "solo" => {
            max_args(1)?;
            Command::Solo {
                tier: arg(0, "TIER")?,
            }
        }
        "drill" => {
            max_args(2)?;
            Command::Drill {
                tier: arg(0, "TIER")?,
                scope: optional(1),
            }
        }
        "investigate" => {
            max_args(1)?;
            Command::Investigate {
                path: arg(0, "PATH")?,
            }
        }
        "uninvestigate" => {
            max_args(1)?;
            Command::Uninvestigate {
                path: arg(0, "PATH")?,
            }
        }
        "clear-investigated" => {
            max_args(0)?;
            Command::ClearInvestigated
        }
        "prompt" => {
            max_args(1)?;
            Command::Prompt {
                path: arg(0, "PATH")?,
            }
        }
        "source" => {
            max_args(2)?;
            let path = arg(0, "PATH")?;
            let line = arg(1, "LINE")?
                .parse::<u32>()
                .ok()
                .filter(|line| *line > 0)
                .ok_or("source LINE must be a positive integer")?;
            Command::Source { path, line }
        }
        "watch" => {
            max_args(1)?;
            Command::Watch { scope: optional(0) }
        }
        other => return Err(format!("Unknown command: {other}\n\n{}", usage())),
    };
    Ok(command)
}
