/// Errors from object registry operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Object names must be non-empty.
    #[error("invalid object name: {0:?}")]
    InvalidName(String),

    /// A previous holder of the registry lock panicked.
    #[error("registry lock poisoned: {0}")]
    Poisoned(String),
}

/// Result alias for registry operations.
pub type StoreResult<T> = Result<T, StoreError>;
