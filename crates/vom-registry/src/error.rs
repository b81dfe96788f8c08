//! Error types for registry operations.

use thiserror::Error;
use vom_store::StoreError;
use vom_types::TypeError;

/// Errors that can occur in the named registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A scope tag outside `g b w t s l a` was used.
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// A mapping mode outside the fixed mode set was used.
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// The name is not acceptable for this kind of entry.
    #[error("invalid name: {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The name is taken by a store's mirror.
    #[error("reserved name: {0}")]
    ReservedName(String),

    /// The value cannot be stored, e.g. a non-finite float.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    /// An autocommand pattern could not be compiled.
    #[error("invalid pattern: {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// No function is registered under this name.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// No command is registered under this name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A previous holder of a registry lock panicked.
    #[error("registry lock poisoned: {0}")]
    Poisoned(String),

    #[error("object store error: {0}")]
    Store(#[from] StoreError),
}

impl From<TypeError> for RegistryError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidScope(tag) => RegistryError::InvalidScope(tag),
            TypeError::InvalidMode(tag) => RegistryError::InvalidMode(tag),
            TypeError::InvalidId(id) => RegistryError::InvalidName {
                name: id,
                reason: "not a valid identifier".into(),
            },
        }
    }
}

/// Convenience type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
