use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use tracing::debug;
use vom_sdk::{BufferId, EventContext, NativeFunction, TabId, Value, Vom, WindowId};

use crate::ex::{self, ExCommand};

/// Autocommands may run ex commands that fire more autocommands; stop here.
const MAX_NESTING: usize = 10;

/// An ex-command session over a [`Vom`]: tracks the current window and tab.
/// The file behind each buffer is kept on the buffer itself, so it travels
/// with the session.
pub struct Editor {
    vom: Vom,
    window: WindowId,
    tab: TabId,
    depth: usize,
    quit: bool,
}

impl Editor {
    /// Start a fresh session with one empty buffer.
    pub fn new(vom: Vom) -> anyhow::Result<Self> {
        let layout = vom.initialize()?;
        register_builtins(&vom)?;
        Ok(Self::with_layout(vom, layout.window, layout.tab))
    }

    /// Continue an imported session in its first window of its first tab.
    pub fn resume(vom: Vom) -> anyhow::Result<Self> {
        for tab in vom.tabs().all()? {
            if let Some(&window) = tab.windows.first() {
                register_builtins(&vom)?;
                return Ok(Self::with_layout(vom, window, tab.id));
            }
        }
        debug!("imported session has no windows; starting fresh");
        Self::new(vom)
    }

    fn with_layout(vom: Vom, window: WindowId, tab: TabId) -> Self {
        Self {
            vom,
            window,
            tab,
            depth: 0,
            quit: false,
        }
    }

    pub fn vom(&self) -> &Vom {
        &self.vom
    }

    pub fn current_window(&self) -> WindowId {
        self.window
    }

    pub fn current_tab(&self) -> TabId {
        self.tab
    }

    pub fn current_buffer(&self) -> anyhow::Result<BufferId> {
        self.vom
            .windows()
            .buffer_of(self.window)?
            .ok_or_else(|| anyhow!("window {} is gone", self.window))
    }

    pub fn file_of(&self, buffer: BufferId) -> anyhow::Result<Option<PathBuf>> {
        Ok(self.vom.buffers().name(buffer)?.map(PathBuf::from))
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Parse and run one command line. Returns the messages it produced.
    pub fn execute(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let cmd = ex::parse(line)?;
        if self.depth == 0 {
            self.vom
                .update_info(|info| info.record_command(line.trim().trim_start_matches(':')))?;
        }
        debug!(?cmd, "ex command");
        self.run(cmd)
    }

    fn run(&mut self, cmd: ExCommand) -> anyhow::Result<Vec<String>> {
        let mut out = Vec::new();
        match cmd {
            ExCommand::Write { file } => out = self.write(file)?,
            ExCommand::Quit { force } => self.quit_window(force)?,
            ExCommand::WriteQuit => {
                out = self.write(None)?;
                self.quit_window(true)?;
            }
            ExCommand::Edit { file } => out = self.edit(file)?,
            ExCommand::Set(settings) if settings.is_empty() => {
                let window = self
                    .vom
                    .windows()
                    .get(self.window)?
                    .ok_or_else(|| anyhow!("window {} is gone", self.window))?;
                for (key, value) in &window.options {
                    out.push(format!("  {key}={value}"));
                }
            }
            ExCommand::Set(settings) => {
                for setting in settings {
                    let (key, value) = setting.option();
                    self.vom.windows().set_option(self.window, key, value)?;
                }
            }
            ExCommand::Let { scope, name, value } => {
                self.vom.variables().set_scoped(&name, value, scope)?;
            }
            ExCommand::Split => self.split(false)?,
            ExCommand::VSplit => self.split(true)?,
            ExCommand::TabNew => {
                let buffer = self.vom.buffers().create(Vec::new())?;
                let window = self.vom.windows().create(buffer)?;
                self.tab = self.vom.tabs().create(vec![window])?;
                self.window = window;
            }
            ExCommand::BufNext => self.cycle_buffer(1)?,
            ExCommand::BufPrev => self.cycle_buffer(-1)?,
            ExCommand::List => out = self.list()?,
            ExCommand::Map { modes, lhs, rhs } => {
                for mode in modes {
                    self.vom
                        .mappings()
                        .create_in(mode, &lhs, rhs.as_str(), None)?;
                }
            }
            ExCommand::Autocmd { event, pattern, command } => {
                self.vom.autocmds().register(
                    &event,
                    &pattern,
                    move |_: &EventContext| Value::from(command.as_str()),
                    None,
                )?;
            }
            ExCommand::Highlight { group, attrs } if attrs.is_empty() => {
                let attrs = self
                    .vom
                    .highlights()
                    .get(&group)?
                    .ok_or_else(|| anyhow!("E411: highlight group not found: {group}"))?;
                let pairs: Vec<String> = attrs.iter().map(|(k, v)| format!("{k}={v}")).collect();
                out.push(format!("{group:<16}xxx {}", pairs.join(" ")));
            }
            ExCommand::Highlight { group, attrs } => {
                self.vom.highlights().define(&group, attrs)?;
            }
            ExCommand::Call { function, args } => {
                let result = self.vom.functions().call(&function, &args)?;
                if !result.is_null() {
                    out.push(result.to_string());
                }
            }
            ExCommand::Pwd => {
                let cwd = std::env::current_dir().context("E187: Unknown working directory")?;
                out.push(cwd.display().to_string());
            }
            ExCommand::User { name, args } => {
                let args: Vec<Value> = args.into_iter().map(Value::from).collect();
                let result = self.vom.commands().execute(&name, &args)?;
                if !result.is_null() {
                    out.push(result.to_string());
                }
            }
        }
        Ok(out)
    }

    fn write(&mut self, file: Option<String>) -> anyhow::Result<Vec<String>> {
        let buffer = self.current_buffer()?;
        let path = match file {
            Some(file) => PathBuf::from(file),
            None => self
                .file_of(buffer)?
                .ok_or_else(|| anyhow!("E32: No file name"))?,
        };
        let name = path.display().to_string();

        let mut out = self.fire("BufWritePre", &name, buffer)?;
        let lines = self.vom.buffers().content(buffer)?.unwrap_or_default();
        let mut text = lines.join("\n");
        if !lines.is_empty() {
            text.push('\n');
        }
        std::fs::write(&path, text)
            .with_context(|| format!("E212: Can't open file for writing: {name}"))?;
        self.vom.buffers().mark_saved(buffer)?;
        if self.vom.buffers().name(buffer)?.is_none() {
            self.vom.buffers().set_name(buffer, name.as_str())?;
        }
        out.push(format!("\"{name}\" {}L written", lines.len()));
        out.extend(self.fire("BufWritePost", &name, buffer)?);
        Ok(out)
    }

    fn quit_window(&mut self, force: bool) -> anyhow::Result<()> {
        let buffer = self.current_buffer()?;
        if !force && self.vom.buffers().is_modified(buffer)? == Some(true) {
            bail!("E37: No write since last change (add ! to override)");
        }
        let windows = self.vom.tabs().windows(self.tab)?.unwrap_or_default();
        let remaining: Vec<WindowId> = windows.into_iter().filter(|w| *w != self.window).collect();
        if let Some(&next) = remaining.first() {
            self.vom.close_window(self.window)?;
            self.window = next;
            return Ok(());
        }
        // Last window of this tab: close the tab if another one has a window.
        let elsewhere = self
            .vom
            .tabs()
            .all()?
            .into_iter()
            .filter(|tab| tab.id != self.tab)
            .find_map(|tab| {
                let window = tab.windows.iter().copied().find(|w| *w != self.window)?;
                Some((tab.id, window))
            });
        match elsewhere {
            Some((tab, window)) => {
                self.vom.close_window(self.window)?;
                self.vom.tabs().delete(self.tab)?;
                debug!(closed = %self.tab, now = %tab, "tab closed");
                self.tab = tab;
                self.window = window;
            }
            None => self.quit = true,
        }
        Ok(())
    }

    fn edit(&mut self, file: String) -> anyhow::Result<Vec<String>> {
        let current = self.current_buffer()?;
        if self.vom.buffers().is_modified(current)? == Some(true) {
            bail!("E37: No write since last change (add ! to override)");
        }
        let path = PathBuf::from(&file);
        let existed = path.exists();
        let lines: Vec<String> = if existed {
            std::fs::read_to_string(&path)
                .with_context(|| format!("E484: Can't open file {file}"))?
                .lines()
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };
        let count = lines.len();
        let buffer = self.vom.buffers().create(lines)?;
        self.vom.buffers().set_name(buffer, file.as_str())?;
        self.vom.windows().set_buffer(self.window, buffer)?;

        let mut out = vec![if existed {
            format!("\"{file}\" {count}L")
        } else {
            format!("\"{file}\" [New]")
        }];
        let event = if existed { "BufRead" } else { "BufNewFile" };
        out.extend(self.fire(event, &file, buffer)?);
        Ok(out)
    }

    fn split(&mut self, vertical: bool) -> anyhow::Result<()> {
        let window = self
            .vom
            .windows()
            .get(self.window)?
            .ok_or_else(|| anyhow!("window {} is gone", self.window))?;
        let (x, y) = window.position;
        let (cols, rows) = window.size;
        let (position, size) = if vertical {
            ((x + cols / 2, y), ((cols / 2).max(1), rows))
        } else {
            ((x, y + rows / 2), (cols, (rows / 2).max(1)))
        };
        let new = self
            .vom
            .windows()
            .create_with(window.buffer, position, size)?;
        self.vom.tabs().add_window(self.tab, new)?;
        self.window = new;
        Ok(())
    }

    fn cycle_buffer(&mut self, step: isize) -> anyhow::Result<()> {
        let ids = self.vom.buffers().ids()?;
        let current = self.current_buffer()?;
        let Some(pos) = ids.iter().position(|id| *id == current) else {
            bail!("E86: Buffer {current} does not exist");
        };
        let len = ids.len() as isize;
        let next = ids[(pos as isize + step).rem_euclid(len) as usize];
        self.vom.windows().set_buffer(self.window, next)?;
        Ok(())
    }

    fn list(&self) -> anyhow::Result<Vec<String>> {
        let current = self.current_buffer()?;
        let out = self
            .vom
            .buffers()
            .all()?
            .into_iter()
            .map(|buffer| {
                let active = if buffer.id == current { "%a" } else { "  " };
                let modified = if buffer.modified { "+" } else { " " };
                let name = buffer.name.as_deref().unwrap_or("[No Name]");
                format!("{:>3} {active} {modified} \"{name}\" {}L", buffer.id, buffer.lines.len())
            })
            .collect();
        Ok(out)
    }

    /// Trigger `event` for `file` and run any ex commands the matching
    /// autocommands return.
    fn fire(&mut self, event: &str, file: &str, buffer: BufferId) -> anyhow::Result<Vec<String>> {
        let ctx = EventContext::new(file).with_data("buffer", buffer.get());
        let results = self.vom.autocmds().trigger(event, &ctx)?;
        let mut out = Vec::new();
        for result in results {
            let Some(line) = result.as_str() else { continue };
            if self.depth >= MAX_NESTING {
                bail!("E218: autocommand nesting too deep");
            }
            self.depth += 1;
            let ran = self.execute(line);
            self.depth -= 1;
            out.extend(ran?);
        }
        Ok(out)
    }
}

/// A handful of builtin functions so `:call` has something to call.
fn register_builtins(vom: &Vom) -> anyhow::Result<()> {
    let builtins = [
        NativeFunction::new("len", |args: &[Value]| {
            let len = match args.first() {
                Some(Value::String(s)) => s.chars().count(),
                Some(Value::List(items)) => items.len(),
                Some(Value::Mapping(map)) => map.len(),
                _ => 0,
            };
            Value::from(i64::try_from(len).unwrap_or(i64::MAX))
        })
        .with_params(["expr"])
        .with_doc("Length of a string, list or dictionary."),
        NativeFunction::new("toupper", |args: &[Value]| {
            Value::from(args.first().map(|v| v.to_string().to_uppercase()).unwrap_or_default())
        })
        .with_params(["expr"]),
        NativeFunction::new("tolower", |args: &[Value]| {
            Value::from(args.first().map(|v| v.to_string().to_lowercase()).unwrap_or_default())
        })
        .with_params(["expr"]),
        NativeFunction::new("join", |args: &[Value]| {
            let sep = args.get(1).and_then(Value::as_str).unwrap_or(" ");
            let items: Vec<String> = args
                .first()
                .and_then(Value::as_list)
                .map(|items| items.iter().map(ToString::to_string).collect())
                .unwrap_or_default();
            Value::from(items.join(sep))
        })
        .with_params(["list", "sep"])
        .with_doc("Join list items into one string."),
    ];
    for function in builtins {
        vom.functions().register(Arc::new(function), None)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> Editor {
        Editor::new(Vom::default()).unwrap()
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn set_changes_current_window() {
        let mut ed = editor();
        ed.execute(":set nowrap scrolloff=4 fdm=marker").unwrap();
        let w = ed.vom().windows().get(ed.current_window()).unwrap().unwrap();
        assert_eq!(w.option("wrap"), Some(&Value::Boolean(false)));
        assert_eq!(w.option("scrolloff"), Some(&Value::Number(4)));
        assert_eq!(w.option("foldmethod"), Some(&Value::from("marker")));

        let shown = ed.execute("set").unwrap();
        assert!(shown.iter().any(|l| l.trim() == "wrap=v:false"));
    }

    #[test]
    fn let_sets_variables() {
        let mut ed = editor();
        ed.execute("let g:answer = 42").unwrap();
        ed.execute("let t:names = ['a', 'b']").unwrap();
        assert_eq!(ed.vom().variable("g:answer").unwrap(), Some(Value::Number(42)));
        assert_eq!(ed.vom().variable("t:names").unwrap(), Some(Value::lines(["a", "b"])));
    }

    #[test]
    fn write_fires_autocmds_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.py");
        let mut ed = editor();
        ed.execute("autocmd BufWritePre *.py let g:pre = 1").unwrap();
        ed.execute("autocmd BufWritePost *.txt let g:txt = 1").unwrap();
        let buffer = ed.current_buffer().unwrap();
        ed.vom().buffers().set_content(buffer, lines(&["print(1)"])).unwrap();

        let out = ed.execute(&format!("w {}", path.display())).unwrap();
        assert!(out[0].ends_with("1L written"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "print(1)\n");
        assert_eq!(ed.vom().buffers().is_modified(buffer).unwrap(), Some(false));
        assert_eq!(ed.vom().variable("g:pre").unwrap(), Some(Value::Number(1)));
        assert_eq!(ed.vom().variable("g:txt").unwrap(), None);

        // The buffer now has a name, so a bare :w works.
        ed.execute("w").unwrap();
    }

    #[test]
    fn write_without_name_fails() {
        let mut ed = editor();
        let err = ed.execute("w").unwrap_err();
        assert!(err.to_string().starts_with("E32"));
    }

    #[test]
    fn edit_reads_file_into_new_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "one\ntwo\n").unwrap();

        let mut ed = editor();
        ed.execute("au BufRead *.md let b:markdown = v:true").unwrap();
        let out = ed.execute(&format!("e {}", path.display())).unwrap();
        assert!(out[0].ends_with("2L"));

        let buffer = ed.current_buffer().unwrap();
        assert_eq!(buffer, BufferId::new(2));
        assert_eq!(ed.vom().buffers().content(buffer).unwrap(), Some(lines(&["one", "two"])));
        assert_eq!(ed.file_of(buffer).unwrap(), Some(path));
        assert_eq!(ed.vom().variable("b:markdown").unwrap(), Some(Value::Boolean(true)));
    }

    #[test]
    fn edit_missing_file_is_new() {
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor();
        let out = ed
            .execute(&format!("e {}", dir.path().join("fresh.txt").display()))
            .unwrap();
        assert!(out[0].ends_with("[New]"));
    }

    #[test]
    fn quit_refuses_modified_buffer() {
        let mut ed = editor();
        let buffer = ed.current_buffer().unwrap();
        ed.vom().buffers().set_content(buffer, lines(&["dirty"])).unwrap();

        let err = ed.execute("q").unwrap_err();
        assert!(err.to_string().starts_with("E37"));
        assert!(!ed.should_quit());

        ed.execute("q!").unwrap();
        assert!(ed.should_quit());
    }

    #[test]
    fn split_and_quit_closes_one_window() {
        let mut ed = editor();
        let first = ed.current_window();
        ed.execute("sp").unwrap();
        ed.execute("vsp").unwrap();
        let tab = ed.current_tab();
        assert_eq!(ed.vom().tabs().windows(tab).unwrap().unwrap().len(), 3);
        let w = ed.vom().windows().get(ed.current_window()).unwrap().unwrap();
        assert_eq!(w.size, (40, 12));

        ed.execute("q").unwrap();
        assert!(!ed.should_quit());
        assert_eq!(ed.vom().tabs().windows(tab).unwrap().unwrap().len(), 2);
        assert_eq!(ed.current_window(), first);
    }

    #[test]
    fn tabnew_and_buffer_cycling() {
        let mut ed = editor();
        ed.execute("tabnew").unwrap();
        assert_eq!(ed.current_tab(), TabId::new(2));
        assert_eq!(ed.current_buffer().unwrap(), BufferId::new(2));

        ed.execute("bn").unwrap();
        assert_eq!(ed.current_buffer().unwrap(), BufferId::new(1));
        ed.execute("bp").unwrap();
        assert_eq!(ed.current_buffer().unwrap(), BufferId::new(2));

        let listing = ed.execute("ls").unwrap();
        assert_eq!(listing.len(), 2);
        assert!(listing[1].contains("%a"));
    }

    #[test]
    fn quitting_last_window_of_a_tab_closes_the_tab() {
        let mut ed = editor();
        let first = ed.current_window();
        ed.execute("tabnew").unwrap();
        let second = ed.current_tab();

        ed.execute("q").unwrap();
        assert!(!ed.should_quit());
        assert_eq!(ed.current_tab(), TabId::new(1));
        assert_eq!(ed.current_window(), first);
        assert_eq!(ed.vom().tabs().get(second).unwrap(), None);
        assert_eq!(ed.vom().windows().len().unwrap(), 1);

        ed.execute("q").unwrap();
        assert!(ed.should_quit());
    }

    #[test]
    fn mirror_names_cannot_be_let() {
        let mut ed = editor();
        assert!(ed.execute("let b:buffer_1 = 7").is_err());
        assert!(ed.execute("let g:x = 1.0e999").is_err());
        let buffer = ed.vom().buffers().get(BufferId::new(1)).unwrap().unwrap();
        assert!(buffer.lines.is_empty());
        assert!(ed.vom().windows().create(BufferId::new(1)).is_ok());
    }

    #[test]
    fn file_names_survive_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kept.txt");
        std::fs::write(&path, "alpha\n").unwrap();

        let mut ed = editor();
        ed.execute(&format!("e {}", path.display())).unwrap();
        let blob = ed.vom().export_state().unwrap();

        let vom = Vom::default();
        vom.import_state(&blob).unwrap();
        let mut resumed = Editor::resume(vom).unwrap();
        let listing = resumed.execute("ls").unwrap();
        assert!(listing.iter().any(|l| l.contains("kept.txt")));

        std::fs::write(&path, "").unwrap();
        resumed.execute("w").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "alpha\n");
    }

    #[test]
    fn maps_highlights_and_calls() {
        let mut ed = editor();
        ed.execute("nmap <leader>w :w<CR>").unwrap();
        let m = ed.vom().mappings().get("n", "<leader>w").unwrap().unwrap();
        assert_eq!(m.rhs.keys(), Some(":w<CR>"));

        ed.execute("hi Comment guifg=grey").unwrap();
        let shown = ed.execute("hi Comment").unwrap();
        assert!(shown[0].contains("guifg=grey"));
        assert!(ed.execute("hi Missing").is_err());

        assert_eq!(ed.execute("call toupper('vim')").unwrap(), vec!["VIM".to_string()]);
        assert_eq!(ed.execute("call len([1, 2, 3])").unwrap(), vec!["3".to_string()]);
        assert!(ed.execute("call Nope()").is_err());
    }

    #[test]
    fn user_commands_run_through_registry() {
        let mut ed = editor();
        ed.vom()
            .commands()
            .register(
                "Greet",
                |args: &[Value]| Value::from(format!("hello {}", args.len())),
                None,
            )
            .unwrap();
        assert_eq!(ed.execute("Greet a b").unwrap(), vec!["hello 2".to_string()]);
        assert_eq!(ed.vom().commands().usage_count("Greet").unwrap(), Some(1));
        assert!(ed.execute("Missing").is_err());
    }

    #[test]
    fn history_is_recorded_once_per_line() {
        let mut ed = editor();
        ed.execute("autocmd BufNewFile * let g:n = 1").unwrap();
        let dir = tempfile::tempdir().unwrap();
        ed.execute(&format!("e {}", dir.path().join("x").display())).unwrap();
        let history = ed.vom().info().unwrap().command_history;
        assert_eq!(history.len(), 2);
        assert!(history[1].starts_with("e "));
    }

    #[test]
    fn runaway_autocmds_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.txt");
        let mut ed = editor();
        ed.execute(&format!("au BufWritePost * w {}", path.display())).unwrap();
        let err = ed.execute(&format!("w {}", path.display())).unwrap_err();
        assert!(err.to_string().contains("E218"));
    }

    #[test]
    fn resume_picks_first_window() {
        let ed = editor();
        let blob = ed.vom().export_state().unwrap();
        let vom = Vom::default();
        vom.import_state(&blob).unwrap();
        let resumed = Editor::resume(vom).unwrap();
        assert_eq!(resumed.current_window(), WindowId::new(1));
        assert!(resumed.vom().functions().contains("len").unwrap());
    }
}
