//! Ex command lines (`:w`, `:set nowrap`, `:let g:x = 1`, ...) parsed into
//! closed enums.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use vom_sdk::{Attributes, MapMode, Scope, Value};

#[derive(Clone, Debug, PartialEq)]
pub enum ExCommand {
    Write { file: Option<String> },
    Quit { force: bool },
    WriteQuit,
    Edit { file: String },
    Set(Vec<Setting>),
    Let { scope: Scope, name: String, value: Value },
    Split,
    VSplit,
    TabNew,
    BufNext,
    BufPrev,
    List,
    Map { modes: Vec<MapMode>, lhs: String, rhs: String },
    Autocmd { event: String, pattern: String, command: String },
    Highlight { group: String, attrs: Attributes },
    Call { function: String, args: Vec<Value> },
    Pwd,
    /// A user command, which always starts with an uppercase letter.
    User { name: String, args: Vec<String> },
}

/// Boolean window options that `:set` understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    Number,
    RelativeNumber,
    Wrap,
    List,
    CursorLine,
    CursorColumn,
    FoldEnable,
}

impl Toggle {
    pub const fn name(self) -> &'static str {
        match self {
            Toggle::Number => "number",
            Toggle::RelativeNumber => "relativenumber",
            Toggle::Wrap => "wrap",
            Toggle::List => "list",
            Toggle::CursorLine => "cursorline",
            Toggle::CursorColumn => "cursorcolumn",
            Toggle::FoldEnable => "foldenable",
        }
    }

    fn parse(word: &str) -> Option<Self> {
        Some(match word {
            "number" | "nu" => Toggle::Number,
            "relativenumber" | "rnu" => Toggle::RelativeNumber,
            "wrap" => Toggle::Wrap,
            "list" => Toggle::List,
            "cursorline" | "cul" => Toggle::CursorLine,
            "cursorcolumn" | "cuc" => Toggle::CursorColumn,
            "foldenable" | "fen" => Toggle::FoldEnable,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoldMethod {
    Manual,
    Indent,
    Expr,
    Marker,
    Syntax,
    Diff,
}

impl FoldMethod {
    pub const fn name(self) -> &'static str {
        match self {
            FoldMethod::Manual => "manual",
            FoldMethod::Indent => "indent",
            FoldMethod::Expr => "expr",
            FoldMethod::Marker => "marker",
            FoldMethod::Syntax => "syntax",
            FoldMethod::Diff => "diff",
        }
    }
}

impl FromStr for FoldMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "manual" => FoldMethod::Manual,
            "indent" => FoldMethod::Indent,
            "expr" => FoldMethod::Expr,
            "marker" => FoldMethod::Marker,
            "syntax" => FoldMethod::Syntax,
            "diff" => FoldMethod::Diff,
            other => bail!("E474: Invalid argument: foldmethod={other}"),
        })
    }
}

/// One argument of `:set`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Setting {
    Toggle(Toggle, bool),
    ScrollOff(u32),
    FoldMethod(FoldMethod),
}

impl Setting {
    /// The window option this setting writes, and its new value.
    pub fn option(self) -> (&'static str, Value) {
        match self {
            Setting::Toggle(opt, on) => (opt.name(), Value::Boolean(on)),
            Setting::ScrollOff(n) => ("scrolloff", Value::from(n)),
            Setting::FoldMethod(m) => ("foldmethod", Value::from(m.name())),
        }
    }
}

impl FromStr for Setting {
    type Err = anyhow::Error;

    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        if let Some((name, value)) = arg.split_once('=') {
            return match name {
                "scrolloff" | "so" => value
                    .parse()
                    .map(Setting::ScrollOff)
                    .map_err(|_| anyhow!("E521: Number required after =: {arg}")),
                "foldmethod" | "fdm" => value.parse().map(Setting::FoldMethod),
                _ => Err(anyhow!("E518: Unknown option: {name}")),
            };
        }
        if let Some(opt) = Toggle::parse(arg) {
            return Ok(Setting::Toggle(opt, true));
        }
        if let Some(opt) = arg.strip_prefix("no").and_then(Toggle::parse) {
            return Ok(Setting::Toggle(opt, false));
        }
        bail!("E518: Unknown option: {arg}")
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Toggle(opt, true) => f.write_str(opt.name()),
            Setting::Toggle(opt, false) => write!(f, "no{}", opt.name()),
            Setting::ScrollOff(n) => write!(f, "scrolloff={n}"),
            Setting::FoldMethod(m) => write!(f, "foldmethod={}", m.name()),
        }
    }
}

/// Parse one command line. A leading `:` is optional.
pub fn parse(line: &str) -> anyhow::Result<ExCommand> {
    let line = line.trim().trim_start_matches(':').trim_start();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    if head.is_empty() {
        bail!("empty command line");
    }

    let cmd = match head {
        "w" | "write" => ExCommand::Write {
            file: (!rest.is_empty()).then(|| rest.to_string()),
        },
        "q" | "quit" => ExCommand::Quit { force: false },
        "q!" | "quit!" => ExCommand::Quit { force: true },
        "wq" | "x" | "xit" => ExCommand::WriteQuit,
        "e" | "edit" => {
            if rest.is_empty() {
                bail!("E32: No file name");
            }
            ExCommand::Edit { file: rest.to_string() }
        }
        "set" | "se" => ExCommand::Set(
            rest.split_whitespace()
                .map(str::parse::<Setting>)
                .collect::<anyhow::Result<_>>()?,
        ),
        "let" => parse_let(rest)?,
        "sp" | "split" => ExCommand::Split,
        "vs" | "vsp" | "vsplit" => ExCommand::VSplit,
        "tabnew" | "tabe" | "tabedit" => ExCommand::TabNew,
        "bn" | "bnext" => ExCommand::BufNext,
        "bp" | "bprevious" | "bN" | "bNext" => ExCommand::BufPrev,
        "ls" | "buffers" | "files" => ExCommand::List,
        "map" => parse_map(
            vec![MapMode::Normal, MapMode::Visual, MapMode::OperatorPending],
            rest,
        )?,
        "nmap" | "nm" => parse_map(vec![MapMode::Normal], rest)?,
        "imap" | "im" => parse_map(vec![MapMode::Insert], rest)?,
        "vmap" | "vm" => parse_map(vec![MapMode::Visual], rest)?,
        "xmap" | "xm" => parse_map(vec![MapMode::VisualBlock], rest)?,
        "smap" => parse_map(vec![MapMode::Select], rest)?,
        "cmap" | "cm" => parse_map(vec![MapMode::CommandLine], rest)?,
        "omap" | "om" => parse_map(vec![MapMode::OperatorPending], rest)?,
        "autocmd" | "au" => parse_autocmd(rest)?,
        "hi" | "highlight" => parse_highlight(rest)?,
        "call" | "cal" => parse_call(rest)?,
        "pwd" | "pw" => ExCommand::Pwd,
        name if name.starts_with(|c: char| c.is_ascii_uppercase()) => ExCommand::User {
            name: name.to_string(),
            args: rest.split_whitespace().map(str::to_string).collect(),
        },
        _ => bail!("E492: Not an editor command: {line}"),
    };
    Ok(cmd)
}

fn parse_let(rest: &str) -> anyhow::Result<ExCommand> {
    let (target, expr) = rest
        .split_once('=')
        .ok_or_else(|| anyhow!("E15: Invalid expression: {rest}"))?;
    let target = target.trim();
    let (scope, name) = match Scope::split_qualified(target) {
        Some((scope, name)) => (scope, name),
        None if target.contains(':') => bail!("E461: Illegal variable name: {target}"),
        None => (Scope::Global, target),
    };
    Ok(ExCommand::Let {
        scope,
        name: name.to_string(),
        value: parse_value(expr)?,
    })
}

fn parse_map(modes: Vec<MapMode>, rest: &str) -> anyhow::Result<ExCommand> {
    let (lhs, rhs) = rest
        .split_once(char::is_whitespace)
        .map(|(l, r)| (l, r.trim()))
        .filter(|(_, r)| !r.is_empty())
        .ok_or_else(|| anyhow!("E474: Invalid argument: {rest}"))?;
    Ok(ExCommand::Map {
        modes,
        lhs: lhs.to_string(),
        rhs: rhs.to_string(),
    })
}

fn parse_autocmd(rest: &str) -> anyhow::Result<ExCommand> {
    let mut parts = rest.splitn(3, char::is_whitespace);
    match (parts.next(), parts.next(), parts.next().map(str::trim)) {
        (Some(event), Some(pattern), Some(command)) if !event.is_empty() && !command.is_empty() => {
            Ok(ExCommand::Autocmd {
                event: event.to_string(),
                pattern: pattern.to_string(),
                command: command.to_string(),
            })
        }
        _ => bail!("E471: Argument required: autocmd {{event}} {{pattern}} {{command}}"),
    }
}

fn parse_highlight(rest: &str) -> anyhow::Result<ExCommand> {
    let mut words = rest.split_whitespace();
    let group = words
        .next()
        .ok_or_else(|| anyhow!("E471: Argument required"))?
        .to_string();
    let mut attrs = Attributes::new();
    for word in words {
        let (key, value) = word
            .split_once('=')
            .ok_or_else(|| anyhow!("E416: Missing equal sign: {word}"))?;
        attrs.insert(key.to_string(), Value::from(value));
    }
    Ok(ExCommand::Highlight { group, attrs })
}

fn parse_call(rest: &str) -> anyhow::Result<ExCommand> {
    let (function, args) = rest
        .split_once('(')
        .and_then(|(f, tail)| Some((f.trim(), tail.trim_end().strip_suffix(')')?)))
        .ok_or_else(|| anyhow!("E107: Missing parentheses: {rest}"))?;
    if function.is_empty() {
        bail!("E129: Function name required");
    }
    let args = split_top_level(args)?
        .into_iter()
        .map(parse_value)
        .collect::<anyhow::Result<_>>()?;
    Ok(ExCommand::Call {
        function: function.to_string(),
        args,
    })
}

/// Parse a literal: `42`, `1.5`, `'str'`, `"str"`, `v:true`, `[..]`, `{..}`.
pub fn parse_value(text: &str) -> anyhow::Result<Value> {
    let text = text.trim();
    match text {
        "" => bail!("E15: Invalid expression: \"\""),
        "v:true" => return Ok(Value::Boolean(true)),
        "v:false" => return Ok(Value::Boolean(false)),
        "v:null" | "v:none" => return Ok(Value::Null),
        _ => {}
    }
    if let Some(body) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return Ok(Value::from(body.replace("''", "'")));
    }
    if let Some(body) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return Ok(Value::from(unescape(body)));
    }
    if let Some(body) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let items = split_top_level(body)?
            .into_iter()
            .map(parse_value)
            .collect::<anyhow::Result<Vec<_>>>()?;
        return Ok(Value::List(items));
    }
    if let Some(body) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        let mut map = Attributes::new();
        for entry in split_top_level(body)? {
            let (key, value) = split_key(entry)?;
            map.insert(key, parse_value(value)?);
        }
        return Ok(Value::Mapping(map));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::Number(n));
    }
    if let Ok(x) = text.parse::<f64>() {
        if text.contains('.') {
            if !x.is_finite() {
                bail!("E15: Float out of range: {text}");
            }
            return Ok(Value::Float(x));
        }
    }
    bail!("E121: Undefined variable: {text}")
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// `'key': value` inside a dictionary literal.
fn split_key(entry: &str) -> anyhow::Result<(String, &str)> {
    let entry = entry.trim();
    let quote = entry
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| anyhow!("E720: Missing colon in Dictionary: {entry}"))?;
    let close = entry[1..]
        .find(quote)
        .ok_or_else(|| anyhow!("E115: Missing quote: {entry}"))?
        + 1;
    let key = entry[1..close].to_string();
    let value = entry[close + 1..]
        .trim_start()
        .strip_prefix(':')
        .ok_or_else(|| anyhow!("E720: Missing colon in Dictionary: {entry}"))?;
    Ok((key, value))
}

/// Split on commas that are not inside quotes or brackets.
fn split_top_level(text: &str) -> anyhow::Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '[' | '{') => depth += 1,
            (None, ']' | '}') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() || depth != 0 {
        bail!("E15: Invalid expression: {text}");
    }
    let last = &text[start..];
    if !last.trim().is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_quit_forms() {
        assert_eq!(parse(":w").unwrap(), ExCommand::Write { file: None });
        assert_eq!(
            parse("w out.txt").unwrap(),
            ExCommand::Write { file: Some("out.txt".into()) }
        );
        assert_eq!(parse("q").unwrap(), ExCommand::Quit { force: false });
        assert_eq!(parse("q!").unwrap(), ExCommand::Quit { force: true });
        assert_eq!(parse("wq").unwrap(), ExCommand::WriteQuit);
        assert!(parse("e").is_err());
    }

    #[test]
    fn set_arguments() {
        let cmd = parse("set nonumber relativenumber so=3 fdm=indent").unwrap();
        assert_eq!(
            cmd,
            ExCommand::Set(vec![
                Setting::Toggle(Toggle::Number, false),
                Setting::Toggle(Toggle::RelativeNumber, true),
                Setting::ScrollOff(3),
                Setting::FoldMethod(FoldMethod::Indent),
            ])
        );
    }

    #[test]
    fn setting_values() {
        let s: Setting = "nowrap".parse().unwrap();
        assert_eq!(s.option(), ("wrap", Value::Boolean(false)));
        assert_eq!(s.to_string(), "nowrap");
        assert_eq!(
            "scrolloff=8".parse::<Setting>().unwrap().option(),
            ("scrolloff", Value::Number(8))
        );
        assert!("tabstop=4".parse::<Setting>().is_err());
        assert!("so=lots".parse::<Setting>().is_err());
        assert!("fdm=magic".parse::<Setting>().is_err());
        assert!("nosuch".parse::<Setting>().is_err());
    }

    #[test]
    fn let_with_and_without_scope() {
        assert_eq!(
            parse("let b:tw = 80").unwrap(),
            ExCommand::Let { scope: Scope::Buffer, name: "tw".into(), value: Value::Number(80) }
        );
        assert_eq!(
            parse("let leader = ','").unwrap(),
            ExCommand::Let { scope: Scope::Global, name: "leader".into(), value: Value::from(",") }
        );
        assert!(parse("let q:x = 1").is_err());
        assert!(parse("let x").is_err());
    }

    #[test]
    fn literals() {
        assert_eq!(parse_value("'it''s'").unwrap(), Value::from("it's"));
        assert_eq!(parse_value("\"a\\tb\"").unwrap(), Value::from("a\tb"));
        assert_eq!(parse_value("1.5").unwrap(), Value::Float(1.5));
        assert_eq!(parse_value("v:true").unwrap(), Value::Boolean(true));
        assert_eq!(
            parse_value("[1, 'a,b', [2]]").unwrap(),
            Value::List(vec![
                Value::Number(1),
                Value::from("a,b"),
                Value::List(vec![Value::Number(2)]),
            ])
        );
        assert_eq!(parse_value("[]").unwrap(), Value::List(vec![]));
        let dict = parse_value("{'a': 1, \"b\": [v:null]}").unwrap();
        let map = dict.as_mapping().unwrap();
        assert_eq!(map["a"], Value::Number(1));
        assert_eq!(map["b"], Value::List(vec![Value::Null]));
        assert!(parse_value("nope").is_err());
        assert!(parse_value("[1, 2").is_err());
    }

    #[test]
    fn floats_out_of_range_are_errors() {
        assert!(parse_value("1.0e999").is_err());
        assert!(parse_value("-1.0e999").is_err());
        assert!(parse_value("[1, 1.0e999]").is_err());
        assert_eq!(parse_value("1.0e300").unwrap(), Value::Float(1.0e300));
    }

    #[test]
    fn mappings() {
        assert_eq!(
            parse("nmap <leader>w :w<CR>").unwrap(),
            ExCommand::Map {
                modes: vec![MapMode::Normal],
                lhs: "<leader>w".into(),
                rhs: ":w<CR>".into(),
            }
        );
        match parse("map gx :call Open()<CR>").unwrap() {
            ExCommand::Map { modes, rhs, .. } => {
                assert_eq!(modes.len(), 3);
                assert_eq!(rhs, ":call Open()<CR>");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse("imap jk").is_err());
    }

    #[test]
    fn autocmd_keeps_command_tail() {
        assert_eq!(
            parse("autocmd BufWritePre *.py let g:fmt = 1").unwrap(),
            ExCommand::Autocmd {
                event: "BufWritePre".into(),
                pattern: "*.py".into(),
                command: "let g:fmt = 1".into(),
            }
        );
        assert!(parse("au BufRead").is_err());
    }

    #[test]
    fn highlight_and_call() {
        match parse("hi Comment guifg=#888888 gui=italic").unwrap() {
            ExCommand::Highlight { group, attrs } => {
                assert_eq!(group, "Comment");
                assert_eq!(attrs["guifg"], Value::from("#888888"));
                assert_eq!(attrs["gui"], Value::from("italic"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse("hi Comment guifg").is_err());

        assert_eq!(
            parse("call toupper('abc')").unwrap(),
            ExCommand::Call { function: "toupper".into(), args: vec![Value::from("abc")] }
        );
        assert_eq!(
            parse("call Init()").unwrap(),
            ExCommand::Call { function: "Init".into(), args: vec![] }
        );
        assert!(parse("call Init").is_err());
    }

    #[test]
    fn user_commands_and_unknowns() {
        assert_eq!(
            parse("Greet vim now").unwrap(),
            ExCommand::User { name: "Greet".into(), args: vec!["vim".into(), "now".into()] }
        );
        assert!(parse("frobnicate").is_err());
        assert!(parse("   ").is_err());
    }
}
