//! Filename patterns for autocommands.
//!
//! The glob syntax is the subset Vim users write in `:autocmd`:
//!
//! | glob     | matches                            |
//! |----------|------------------------------------|
//! | `*`      | any run of characters, `/` included |
//! | `?`      | any single character               |
//! | `{a,b}`  | either alternative                 |
//! | `\x`     | the literal character `x`          |
//!
//! A pattern without a `/` is matched against the basename of the file, so
//! `*.py` matches `src/main.py`. A pattern containing `/` must match the
//! whole filename.

use regex::Regex;

use crate::error::{RegistryError, RegistryResult};

/// A compiled autocommand pattern.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    regex: Regex,
    basename_only: bool,
}

impl Pattern {
    /// Compile a glob.
    ///
    /// # Examples
    ///
    /// ```
    /// use vom_registry::Pattern;
    ///
    /// let pat = Pattern::new("*.{rs,toml}").unwrap();
    /// assert!(pat.matches("crates/vom/Cargo.toml"));
    /// assert!(!pat.matches("README.md"));
    /// ```
    pub fn new(glob: &str) -> RegistryResult<Self> {
        if glob.is_empty() {
            return Err(invalid(glob, "pattern must not be empty"));
        }
        let body = translate(glob)?;
        let regex = Regex::new(&format!("^(?:{body})$"))
            .map_err(|e| invalid(glob, e.to_string()))?;
        Ok(Self {
            source: glob.to_string(),
            regex,
            basename_only: !glob.contains('/'),
        })
    }

    /// The glob as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, filename: &str) -> bool {
        let subject = if self.basename_only {
            filename.rsplit('/').next().unwrap_or(filename)
        } else {
            filename
        };
        self.regex.is_match(subject)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn invalid(pattern: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

fn translate(glob: &str) -> RegistryResult<String> {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut depth = 0usize;
    let mut chars = glob.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '{' => {
                depth += 1;
                out.push_str("(?:");
            }
            '}' if depth > 0 => {
                depth -= 1;
                out.push(')');
            }
            ',' if depth > 0 => out.push('|'),
            '\\' => match chars.next() {
                Some(next) => out.push_str(&regex::escape(next.encode_utf8(&mut [0; 4]))),
                None => out.push_str(r"\\"),
            },
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    if depth > 0 {
        return Err(invalid(glob, "unbalanced '{'"));
    }
    Ok(out)
}
