#![forbid(unsafe_code)]

mod config;
mod defaults;
mod error;
mod render;
mod taxonomy_file;
mod tracing_setup;
mod transport;
mod wire;

use config::{Command, Config, parse_args, usage};
use error::CliError;
use render::FindingRow;
use rv_core::{LineLookup, ReconSession, ReconView, Scope, Taxonomy, file_path};
use rv_storage::SqliteStore;
use serde_json::{Value, json};
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};
use tracing_setup::{Verbosity, init_subscriber};
use transport::FileTransport;

type Session = ReconSession<FileTransport, SqliteStore>;

fn open_session(cfg: &Config) -> Result<Session, CliError> {
    let taxonomy = match &cfg.taxonomy {
        Some(path) => taxonomy_file::load_taxonomy(path)?,
        None => Taxonomy::builtin(),
    };
    // two connections to one database: the transport owns the marks, the session the view state
    let marks = SqliteStore::open(&cfg.storage_dir)?;
    let state = SqliteStore::open(&cfg.storage_dir)?;
    let root = cfg.root.is_dir().then(|| cfg.root.clone());
    let transport = FileTransport::new(cfg.snapshot.clone(), root, taxonomy.clone(), marks);
    Ok(ReconSession::open(taxonomy, transport, state))
}

fn resolve_scope(session: &Session, raw: Option<&str>) -> Result<Scope, CliError> {
    let Some(raw) = raw else {
        return Ok(Scope::Root);
    };
    if !session.snapshot().recon_available {
        return Ok(Scope::Root);
    }
    Scope::resolve(&session.snapshot().tree, raw)
        .ok_or_else(|| CliError::UnknownScope(raw.to_string()))
}

fn apply_view_flags(session: &mut Session, cfg: &Config) {
    if let Some(focus) = cfg.focus {
        session.set_focus(focus);
    }
    if cfg.source {
        session.set_source_on(true);
    }
}

fn enter(session: &mut Session, cfg: &Config, raw: Option<&str>) -> Result<(), CliError> {
    let scope = resolve_scope(session, raw)?;
    session.navigate(scope);
    apply_view_flags(session, cfg);
    Ok(())
}

fn finding_rows(session: &mut Session) -> Vec<FindingRow> {
    let Scope::File { folder, file } = session.scope().clone() else {
        return Vec::new();
    };
    let source_on = session.filter().source_on();
    let path = file_path(&folder, &file);
    session
        .visible_findings(&folder, &file)
        .into_iter()
        .map(|finding| {
            let source = if source_on {
                match session.source_line(&path, finding.line) {
                    LineLookup::Ready(text) => Some(text),
                    LineLookup::Pending | LineLookup::Unavailable => None,
                }
            } else {
                None
            };
            FindingRow { finding, source }
        })
        .collect()
}

fn write_json(out: &mut dyn Write, value: &Value, pretty: bool) -> Result<(), CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(out, "{text}")?;
    Ok(())
}

fn emit_view(
    session: &mut Session,
    cfg: &Config,
    out: &mut dyn Write,
    pretty: bool,
) -> Result<(), CliError> {
    let rows = finding_rows(session);
    let view = session.view();
    if cfg.json {
        write_json(out, &render::view_json(session.snapshot(), &view, &rows), pretty)
    } else {
        let text = render::view_text(session.taxonomy(), session.snapshot(), &view, &rows);
        write!(out, "{text}")?;
        Ok(())
    }
}

fn emit_tiers(session: &Session, cfg: &Config, out: &mut dyn Write) -> Result<(), CliError> {
    if cfg.json {
        write_json(out, &render::tiers_json(session.taxonomy(), session.filter()), true)
    } else {
        write!(out, "{}", render::tiers_text(session.taxonomy(), session.filter()))?;
        Ok(())
    }
}

/// Investigated paths use the tree's `folder/file` spelling when the file is known.
fn investigated_path(session: &Session, raw: &str) -> String {
    match Scope::resolve(&session.snapshot().tree, raw) {
        Some(scope @ Scope::File { .. }) => scope.path(),
        _ => raw.trim().trim_matches('/').to_string(),
    }
}

fn refresh_or_warn(session: &mut Session) {
    if let Err(err) = session.refresh() {
        warn!(%err, "snapshot unavailable; continuing with stored state");
    }
}

fn emit_investigated(
    session: &Session,
    cfg: &Config,
    out: &mut dyn Write,
    message: &str,
) -> Result<(), CliError> {
    if cfg.json {
        let value = json!({ "investigated_files": session.investigated().to_vec() });
        write_json(out, &value, true)
    } else {
        writeln!(out, "{message}")?;
        Ok(())
    }
}

fn run(cfg: &Config, out: &mut dyn Write) -> Result<(), CliError> {
    if cfg.command == Command::Help {
        write!(out, "{}", usage())?;
        return Ok(());
    }
    let mut session = open_session(cfg)?;

    match &cfg.command {
        Command::Help => {}
        Command::View { scope } => {
            session.refresh()?;
            enter(&mut session, cfg, scope.as_deref())?;
            emit_view(&mut session, cfg, out, true)?;
        }
        Command::Tiers => emit_tiers(&session, cfg, out)?,
        Command::ToggleDimension { dim } => {
            let on = session.toggle_dimension(dim)?;
            info!(dim = %dim, on, "dimension toggled");
            emit_tiers(&session, cfg, out)?;
        }
        Command::ToggleTier { tier } => {
            let on = session.toggle_tier(tier)?;
            info!(tier = %tier, on, "tier toggled");
            emit_tiers(&session, cfg, out)?;
        }
        Command::Solo { tier } => {
            session.solo_tier(tier)?;
            emit_tiers(&session, cfg, out)?;
        }
        Command::Drill { tier, scope } => {
            session.refresh()?;
            let target = resolve_scope(&session, scope.as_deref())?;
            session.drill_tier(tier, target)?;
            apply_view_flags(&mut session, cfg);
            emit_view(&mut session, cfg, out, true)?;
        }
        Command::Investigate { path } => {
            refresh_or_warn(&mut session);
            let path = investigated_path(&session, path);
            session.mark_investigated(&path, true)?;
            emit_investigated(&session, cfg, out, &format!("investigated: {path}"))?;
        }
        Command::Uninvestigate { path } => {
            refresh_or_warn(&mut session);
            let path = investigated_path(&session, path);
            session.mark_investigated(&path, false)?;
            emit_investigated(&session, cfg, out, &format!("not investigated: {path}"))?;
        }
        Command::ClearInvestigated => {
            session.clear_investigated()?;
            emit_investigated(&session, cfg, out, "investigated marks cleared")?;
        }
        Command::Prompt { path } => {
            session.refresh()?;
            let scope = resolve_scope(&session, Some(path))?;
            let Scope::File { folder, file } = scope.clone() else {
                return Err(CliError::NotAFile(path.clone()));
            };
            session.navigate(scope);
            apply_view_flags(&mut session, cfg);
            match session.compose_prompt(&folder, &file) {
                Some(prompt) if cfg.json => write_json(out, &json!({ "prompt": prompt }), true)?,
                Some(prompt) => write!(out, "{prompt}")?,
                None => eprintln!("no visible findings in {path}"),
            }
        }
        Command::Source { path, line } => {
            let text = match session.source_line(path, *line) {
                LineLookup::Ready(text) => Some(text),
                LineLookup::Pending | LineLookup::Unavailable => None,
            };
            if cfg.json {
                write_json(out, &json!({ "path": path, "line": line, "content": text }), true)?;
            } else {
                writeln!(out, "{}", text.unwrap_or_else(|| "(source unavailable)".to_string()))?;
            }
        }
        Command::Watch { scope } => watch(&mut session, cfg, scope.as_deref(), out)?,
    }
    Ok(())
}

/// Change detector for `watch`: re-render only when the snapshot bytes or the view differ.
#[derive(Default)]
struct WatchState {
    entered: bool,
    digest: Option<String>,
    view: Option<ReconView>,
}

impl WatchState {
    fn tick(
        &mut self,
        session: &mut Session,
        cfg: &Config,
        scope: Option<&str>,
        out: &mut dyn Write,
    ) -> Result<bool, CliError> {
        if let Err(err) = session.refresh() {
            warn!(%err, "poll failed; keeping the previous view");
            return Ok(false);
        }
        if !self.entered && session.snapshot().recon_available {
            enter(session, cfg, scope)?;
            self.entered = true;
        }

        let digest = session.transport().last_digest().map(str::to_string);
        let mut view = session.view();
        view.generation = 0;
        if self.view.as_ref() == Some(&view) && self.digest == digest {
            return Ok(false);
        }
        self.digest = digest;
        self.view = Some(view);

        if !cfg.json {
            writeln!(out, "---")?;
        }
        emit_view(session, cfg, out, false)?;
        out.flush()?;
        Ok(true)
    }
}

fn watch(
    session: &mut Session,
    cfg: &Config,
    scope: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let mut state = WatchState::default();
    let interval = Duration::from_millis(cfg.interval_ms);
    loop {
        state.tick(session, cfg, scope, out)?;
        std::thread::sleep(interval);
    }
}

fn main() {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(2);
    });
    init_subscriber(Verbosity::from_flags(cfg.verbose, cfg.quiet), cfg.no_color);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = run(&cfg, &mut out) {
        eprintln!("rv: {err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests;
