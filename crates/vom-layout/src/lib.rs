//! Layout stores for the Vim object model: buffers, windows, and tab pages.
//!
//! The three stores form the editor's ownership hierarchy: a tab holds an
//! ordered list of windows, and every window views exactly one buffer.
//!
//! # Architecture
//!
//! - Each store owns its table of records behind a `RwLock` and hands out
//!   sequential ids starting at 1. Ids are never reused within a session.
//! - Every create or update also refreshes the record's mirror in the shared
//!   [`ObjectStore`](vom_store::ObjectStore) (`b:buffer_N`, `w:window_N`,
//!   `t:tab_N`).
//! - References are checked when they are made: a window cannot be created
//!   over a buffer that does not exist, and a tab cannot list a window that
//!   does not exist. Both checks go through the shared registry. Deleting a
//!   buffer a window still shows, or a window a tab still lists, is refused.
//! - Operations on an unknown id return `Ok(None)` / `Ok(false)` and leave
//!   state unchanged.
//!
//! # Modules
//!
//! - [`buffer`]: [`BufferStore`] and [`Buffer`]
//! - [`window`]: [`WindowStore`], [`Window`], and the default option set
//! - [`tab`]: [`TabStore`] and [`Tab`]

pub mod buffer;
pub mod error;
mod mirror;
pub mod tab;
mod table;
pub mod window;

pub use buffer::{Buffer, BufferStore};
pub use error::{LayoutError, LayoutResult};
pub use tab::{Tab, TabStore};
pub use table::check_id;
pub use window::{default_window_options, Window, WindowStore};
