use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("invalid mode: {0}")]
    InvalidMode(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}
