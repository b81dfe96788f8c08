//! Named registries of the Vim object model.
//!
//! Each registry here is a typed front end over the shared
//! [`ObjectStore`](vom_store::ObjectStore): it keeps its own table (callables
//! cannot live in the registry) and mirrors a data-only view of every entry
//! under a `g:`-scoped key such as `g:command_Greet` or `g:mapping_n_<leader>w`.
//!
//! # Error discipline
//!
//! - Contract violations (bad scope tag, bad mode, malformed name or pattern)
//!   fail before anything is mutated.
//! - Invoking a name that was never registered fails with
//!   [`RegistryError::UnknownFunction`] or [`RegistryError::UnknownCommand`].
//! - Looking up or toggling something that does not exist returns
//!   `Ok(None)` / `Ok(false)`.
//!
//! Callbacks are never run while a registry lock is held, so a callback may
//! freely call back into any registry.
//!
//! # Modules
//!
//! - [`variable`]: [`VariableStore`], scoped `g:`/`b:`/... variables
//! - [`function`]: [`FunctionRegistry`] and the [`Callable`] trait
//! - [`command`]: [`CommandRegistry`] with usage counting
//! - [`highlight`]: [`HighlightRegistry`] of style attribute sets
//! - [`autocmd`]: [`AutocmdRegistry`], event dispatch by filename pattern
//! - [`pattern`]: glob patterns used by autocommands
//! - [`mapping`]: [`MappingTable`], per-mode key mappings
//! - [`names`]: name validation

pub mod autocmd;
pub mod command;
pub mod error;
pub mod function;
pub mod highlight;
mod lock;
pub mod mapping;
pub mod names;
pub mod pattern;
pub mod variable;

pub use autocmd::{AutocmdCallback, AutocmdInfo, AutocmdRegistry, EventContext};
pub use command::{CommandCallback, CommandInfo, CommandRegistry};
pub use error::{RegistryError, RegistryResult};
pub use function::{Callable, FunctionRegistry, NativeFunction};
pub use highlight::HighlightRegistry;
pub use mapping::{MapTarget, Mapping, MappingCallback, MappingTable};
pub use pattern::Pattern;
pub use variable::VariableStore;
