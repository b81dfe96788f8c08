//! High-level SDK for the Vim object model.
//!
//! [`Vom`] owns one object registry and every store built on top of it. It is
//! the main entry point for applications embedding VOM:
//!
//! ```
//! use vom_sdk::{Vom, VomConfig};
//!
//! let vom = Vom::new(VomConfig::default());
//! let layout = vom.initialize().unwrap();
//! vom.buffers().set_content(layout.buffer, vec!["hello".into()]).unwrap();
//!
//! let blob = vom.export_state().unwrap();
//! vom.cleanup().unwrap();
//! vom.import_state(&blob).unwrap();
//! assert_eq!(
//!     vom.buffers().content(layout.buffer).unwrap(),
//!     Some(vec!["hello".to_string()])
//! );
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod system;

pub use config::{VomConfig, WindowConfig};
pub use error::{SdkError, SdkResult};
pub use session::{Position, SessionDocument, SessionInfo, SessionSnapshot};
pub use system::{InitialLayout, Vom};

// Re-export key types
pub use vom_layout::{Buffer, LayoutError, Tab, Window};
pub use vom_registry::{
    Callable, EventContext, MapTarget, Mapping, NativeFunction, RegistryError,
};
pub use vom_store::{ObjectStore, StoreError};
pub use vom_types::{attributes, Attributes, BufferId, MapMode, Object, Scope, TabId, Value, ValueKind, WindowId};
