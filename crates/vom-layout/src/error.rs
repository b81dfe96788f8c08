use thiserror::Error;
use vom_store::StoreError;
use vom_types::{BufferId, TabId, WindowId};

/// Errors from layout store operations.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A window was pointed at a buffer that does not exist.
    #[error("unknown buffer: {0}")]
    UnknownBuffer(BufferId),

    /// A tab was given a window that does not exist.
    #[error("unknown window: {0}")]
    UnknownWindow(WindowId),

    /// A buffer cannot be deleted while a window still shows it.
    #[error("buffer {buffer} is shown in window {window}")]
    BufferInUse { buffer: BufferId, window: WindowId },

    /// A window cannot be deleted while a tab still lists it.
    #[error("window {window} belongs to tab {tab}")]
    WindowInUse { window: WindowId, tab: TabId },

    /// Ids are positive and below `u32::MAX`.
    #[error("invalid id: {0}")]
    InvalidId(u32),

    /// Every id below `u32::MAX` has been handed out.
    #[error("no ids left")]
    IdsExhausted,

    /// A previous holder of a table lock panicked.
    #[error("table lock poisoned: {0}")]
    Poisoned(String),

    #[error("registry error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;
