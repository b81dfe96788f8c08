//! Scope-aware object registry for the Vim object model.
//!
//! Every store in VOM (variables, buffers, windows, commands, ...) mirrors its
//! state into one shared registry, keyed by scope-qualified name
//! (`g:mapleader`, `b:buffer_1`, `g:command_greet`). The registry is the
//! uniform index over everything the typed stores manage.
//!
//! # Design Rules
//!
//! 1. Objects are owned by the registry; stores refer to them by key.
//! 2. Creating an object under an existing name replaces it.
//! 3. A missing name is reported as `Ok(None)` / `Ok(false)`, never as an error.
//! 4. The kind of an object is inferred once, at creation.
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `BTreeMap`-based registry

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
