use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use tracing::debug;
use vom_sdk::session::{self, SessionDocument};
use vom_sdk::{Vom, VomConfig};

use crate::cli::*;
use crate::editor::Editor;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Exec(args) => cmd_exec(config, cli.session, args),
        Command::Repl(_) => cmd_repl(config, cli.session),
        Command::Inspect(args) => cmd_inspect(args, cli.format),
        Command::Config(_) => cmd_config(&config, cli.format),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<VomConfig> {
    match path {
        Some(path) => VomConfig::load(path)
            .with_context(|| format!("reading config {}", path.display())),
        None => Ok(VomConfig::default()),
    }
}

/// Resume from `session` if it exists, otherwise start fresh.
fn open_editor(config: VomConfig, session: Option<&Path>) -> anyhow::Result<Editor> {
    let vom = Vom::new(config);
    match session {
        Some(path) if path.exists() => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading session {}", path.display()))?;
            vom.import_state(&text)
                .with_context(|| format!("importing session {}", path.display()))?;
            debug!(path = %path.display(), "session resumed");
            Editor::resume(vom)
        }
        _ => Editor::new(vom),
    }
}

/// Write the session next to its destination, then move it into place.
fn save_session(editor: &Editor, path: &Path) -> anyhow::Result<()> {
    let text = editor.vom().export_state()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.persist(path)
        .with_context(|| format!("saving session {}", path.display()))?;
    debug!(path = %path.display(), "session saved");
    Ok(())
}

fn report(result: anyhow::Result<Vec<String>>) -> bool {
    match result {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            true
        }
        Err(e) => {
            eprintln!("{} {e:#}", "✗".red().bold());
            false
        }
    }
}

fn cmd_exec(config: VomConfig, session: Option<PathBuf>, args: ExecArgs) -> anyhow::Result<()> {
    let mut editor = open_editor(config, session.as_deref())?;
    let mut failed = 0usize;
    for line in &args.commands {
        if !report(editor.execute(line)) {
            failed += 1;
            if args.strict {
                break;
            }
        }
        if editor.should_quit() {
            break;
        }
    }
    if let Some(path) = &session {
        save_session(&editor, path)?;
        println!("{} Session saved to {}", "✓".green().bold(), path.display().to_string().bold());
    }
    if failed > 0 {
        anyhow::bail!("{failed} command(s) failed");
    }
    Ok(())
}

fn cmd_repl(config: VomConfig, session: Option<PathBuf>) -> anyhow::Result<()> {
    let mut editor = open_editor(config, session.as_deref())?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut lines = stdin.lock().lines();
    while !editor.should_quit() {
        print!("{}", ":".cyan());
        stdout.flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        report(editor.execute(&line));
    }
    if let Some(path) = &session {
        save_session(&editor, path)?;
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let doc = session::decode(&text)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&doc.snapshot)?),
        OutputFormat::Text => print_summary(&doc),
    }
    Ok(())
}

fn print_summary(doc: &SessionDocument) {
    let s = &doc.snapshot;
    println!("{} Session {}", "✓".green().bold(), doc.session_id.to_string().cyan());
    println!("  Exported: {}", doc.exported_at.to_rfc3339().dimmed());
    println!("  Buffers: {}  Windows: {}  Tabs: {}", s.buffers.len(), s.windows.len(), s.tabs.len());
    for buffer in &s.buffers {
        let flag = if buffer.modified { "+".yellow() } else { " ".normal() };
        println!("    {}{} {} lines", buffer.id.to_string().bold(), flag, buffer.lines.len());
    }
    println!("  Variables: {}", s.variables.len());
    for var in &s.variables {
        println!("    {} = {}", var.scope.qualify(&var.name).yellow(), var.value);
    }
    println!("  Highlights: {}  Mappings: {}", s.highlights.len(), s.mappings.len());
    for m in &s.mappings {
        println!("    {} {} → {}", m.mode.tag().green(), m.lhs.bold(), m.rhs);
    }
    println!("  History: {} commands, {} searches", s.info.command_history.len(), s.info.search_history.len());
}

fn cmd_config(config: &VomConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}
