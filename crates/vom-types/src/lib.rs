//! Foundation types for the Vim object model (VOM).
//!
//! This crate provides the value, scope, and identifier types shared by every
//! other VOM crate. It carries no state of its own.
//!
//! # Key Types
//!
//! - [`Value`]: Dynamically typed value held by every named object
//! - [`ValueKind`]: Type tag inferred from a [`Value`]
//! - [`Scope`]: Namespace an object belongs to (`g:`, `b:`, `w:`, ...)
//! - [`MapMode`]: Editor mode a key mapping applies in
//! - [`BufferId`], [`WindowId`], [`TabId`]: Sequential layout identifiers
//! - [`Object`]: A named, scoped, typed entry in the object registry

pub mod error;
pub mod ids;
pub mod mode;
pub mod object;
pub mod scope;
pub mod value;

pub use error::TypeError;
pub use ids::{BufferId, TabId, WindowId};
pub use mode::MapMode;
pub use object::{attributes, Attributes, Object, SOURCE_KEY};
pub use scope::Scope;
pub use value::{Value, ValueKind};
