//! Name validation for registry entries.
//!
//! - Variable names: a letter or `_`, followed by letters, digits, `_` or `#`
//!   (the `#` separates autoload segments, as in `g:plug#home`)
//! - Function and command names: non-empty, no whitespace, no `:`
//! - Event and highlight-group names: non-empty, no whitespace
//! - Mapping left-hand sides: non-empty
//!
//! Variables share the registry with the mirrors the stores keep, so the
//! mirror key shapes are reserved: `b:buffer_N`, `w:window_N`, `t:tab_N`,
//! and the `g:` prefixes listed in [`RESERVED_GLOBAL_PREFIXES`].

use vom_types::Scope;

use crate::error::{RegistryError, RegistryResult};

/// Global name prefixes the registries write their mirrors under.
pub const RESERVED_GLOBAL_PREFIXES: [&str; 5] =
    ["function_", "command_", "highlight_", "autocmd_", "mapping_"];

fn invalid(name: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a variable name (without its scope prefix).
///
/// # Examples
///
/// ```
/// use vom_registry::names::validate_variable_name;
///
/// assert!(validate_variable_name("mapleader").is_ok());
/// assert!(validate_variable_name("plug#home").is_ok());
/// assert!(validate_variable_name("1st").is_err());
/// assert!(validate_variable_name("g:x").is_err());
/// ```
pub fn validate_variable_name(name: &str) -> RegistryResult<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid(name, "variable name must not be empty"));
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid(name, "must start with a letter or '_'"));
    }
    if let Some(ch) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '#')) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

/// Whether `scope:name` is a key some store mirrors its records under.
///
/// # Examples
///
/// ```
/// use vom_registry::names::is_reserved;
/// use vom_types::Scope;
///
/// assert!(is_reserved(Scope::Buffer, "buffer_1"));
/// assert!(!is_reserved(Scope::Buffer, "buffer_name"));
/// assert!(is_reserved(Scope::Global, "command_Greet"));
/// assert!(!is_reserved(Scope::Window, "buffer_1"));
/// ```
pub fn is_reserved(scope: Scope, name: &str) -> bool {
    let numbered = |prefix: &str| {
        name.strip_prefix(prefix)
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    };
    match scope {
        Scope::Buffer => numbered("buffer_"),
        Scope::Window => numbered("window_"),
        Scope::Tab => numbered("tab_"),
        Scope::Global => RESERVED_GLOBAL_PREFIXES.iter().any(|p| name.starts_with(p)),
        _ => false,
    }
}

/// Validate the name of a function or command.
pub fn validate_callable_name(name: &str) -> RegistryResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(invalid(name, "must not contain whitespace"));
    }
    if name.contains(':') {
        return Err(invalid(name, "must not contain ':'"));
    }
    Ok(())
}

/// Validate an event or highlight-group name.
pub fn validate_word(name: &str) -> RegistryResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(invalid(name, "must not contain whitespace"));
    }
    Ok(())
}

/// Validate the left-hand side of a key mapping.
pub fn validate_lhs(lhs: &str) -> RegistryResult<()> {
    if lhs.is_empty() {
        return Err(invalid(lhs, "left-hand side must not be empty"));
    }
    Ok(())
}
