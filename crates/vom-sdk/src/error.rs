use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("unsupported session format: {0:?}")]
    UnsupportedFormat(String),

    #[error("unsupported session version: {found} (this build reads {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("session checksum mismatch: recorded {recorded}, computed {computed}")]
    ChecksumMismatch { recorded: String, computed: String },

    #[error("session decode error: {0}")]
    Decode(String),

    #[error("invalid session contents: {0}")]
    InvalidSnapshot(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("session state lock poisoned: {0}")]
    Poisoned(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] vom_store::StoreError),

    #[error("layout error: {0}")]
    Layout(#[from] vom_layout::LayoutError),

    #[error("registry error: {0}")]
    Registry(#[from] vom_registry::RegistryError),
}

pub type SdkResult<T> = Result<T, SdkError>;
