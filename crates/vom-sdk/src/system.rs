use std::sync::{Arc, RwLock};

use tracing::{debug, warn};
use uuid::Uuid;
use vom_layout::{BufferStore, TabStore, WindowStore};
use vom_registry::{
    AutocmdRegistry, CommandRegistry, FunctionRegistry, HighlightRegistry, MapTarget,
    MappingTable, VariableStore,
};
use vom_store::{InMemoryObjectStore, ObjectStore};
use vom_types::{BufferId, Scope, TabId, WindowId};

use crate::config::VomConfig;
use crate::error::{SdkError, SdkResult};
use crate::session::{self, MappingEntry, SessionInfo, SessionSnapshot, VariableEntry};

/// The layout created by [`Vom::initialize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitialLayout {
    pub buffer: BufferId,
    pub window: WindowId,
    pub tab: TabId,
}

/// One editor session: the shared object registry plus every store built
/// on it.
pub struct Vom {
    config: VomConfig,
    session_id: RwLock<Uuid>,
    registry: Arc<InMemoryObjectStore>,
    variables: VariableStore,
    functions: FunctionRegistry,
    buffers: BufferStore,
    windows: WindowStore,
    tabs: TabStore,
    commands: CommandRegistry,
    highlights: HighlightRegistry,
    autocmds: AutocmdRegistry,
    mappings: MappingTable,
    info: RwLock<SessionInfo>,
}

impl Vom {
    /// Create an empty session. Call [`initialize`](Self::initialize) to get
    /// the usual first buffer, window and tab.
    pub fn new(config: VomConfig) -> Self {
        let registry = Arc::new(InMemoryObjectStore::new());
        let shared: Arc<dyn ObjectStore> = registry.clone();
        let windows = WindowStore::new(shared.clone())
            .with_default_size(config.window.size())
            .with_option_overrides(config.window.option_overrides());
        Self {
            session_id: RwLock::new(Uuid::now_v7()),
            variables: VariableStore::new(shared.clone()),
            functions: FunctionRegistry::new(shared.clone()),
            buffers: BufferStore::new(shared.clone()),
            windows,
            tabs: TabStore::new(shared.clone()),
            commands: CommandRegistry::new(shared.clone()),
            highlights: HighlightRegistry::new(shared.clone()),
            autocmds: AutocmdRegistry::new(shared.clone()),
            mappings: MappingTable::new(shared),
            registry,
            config,
            info: RwLock::new(SessionInfo::default()),
        }
    }

    /// Seed the leader keys and create one buffer shown in one window on
    /// one tab.
    pub fn initialize(&self) -> SdkResult<InitialLayout> {
        self.variables
            .set_global("mapleader", self.config.mapleader.as_str())?;
        self.variables
            .set_global("maplocalleader", self.config.maplocalleader.as_str())?;
        let buffer = self.buffers.create(Vec::new())?;
        let window = self.windows.create(buffer)?;
        let tab = self.tabs.create(vec![window])?;
        debug!(session = %self.session_id()?, "session initialized");
        Ok(InitialLayout { buffer, window, tab })
    }

    /// Drop all state: every store, the registry, and the session info.
    ///
    /// Layout ids start over at 1 afterwards.
    pub fn cleanup(&self) -> SdkResult<()> {
        self.tabs.clear()?;
        self.windows.clear()?;
        self.buffers.clear()?;
        self.variables.clear()?;
        self.functions.clear()?;
        self.commands.clear()?;
        self.highlights.clear()?;
        self.autocmds.clear()?;
        self.mappings.clear()?;
        self.registry.clear()?;
        *self.info_mut()? = SessionInfo::default();
        debug!("session cleaned up");
        Ok(())
    }

    /// Capture every data store.
    pub fn snapshot(&self) -> SdkResult<SessionSnapshot> {
        let variables = self
            .variables
            .all()?
            .into_iter()
            .map(|(scope, name, value)| VariableEntry { scope, name, value })
            .collect();

        let mut mappings = Vec::new();
        for m in self.mappings.all()? {
            match m.rhs {
                MapTarget::Keys(rhs) => mappings.push(MappingEntry {
                    mode: m.mode,
                    lhs: m.lhs,
                    rhs,
                    options: m.options,
                    enabled: m.enabled,
                }),
                MapTarget::Callback(_) => {
                    warn!(mode = %m.mode, lhs = %m.lhs, "callback mapping left out of snapshot");
                }
            }
        }

        Ok(SessionSnapshot {
            variables,
            buffers: self.buffers.all()?,
            windows: self.windows.all()?,
            tabs: self.tabs.all()?,
            highlights: self.highlights.all()?.into_iter().collect(),
            mappings,
            info: self.info()?,
        })
    }

    /// Encode the session as a versioned JSON document.
    pub fn export_state(&self) -> SdkResult<String> {
        session::encode(&self.snapshot()?, self.session_id()?)
    }

    /// Replace every data store with the contents of a session document.
    ///
    /// The document is fully verified before anything changes: envelope,
    /// checksum, and the cross-references and names the stores would refuse
    /// (see [`SessionSnapshot::validate`]). Functions, commands,
    /// autocommands and callback mappings are kept as they are.
    pub fn import_state(&self, text: &str) -> SdkResult<()> {
        let doc = session::decode(text)?;
        let snapshot = doc.snapshot;

        self.tabs.clear()?;
        self.windows.clear()?;
        self.buffers.clear()?;
        self.variables.clear()?;
        self.highlights.clear()?;
        for m in self.mappings.all()? {
            if !m.rhs.is_callback() {
                self.mappings.delete(m.mode.tag(), &m.lhs)?;
            }
        }

        for buffer in snapshot.buffers {
            self.buffers.restore(buffer)?;
        }
        for window in snapshot.windows {
            self.windows.restore(window)?;
        }
        for tab in snapshot.tabs {
            self.tabs.restore(tab)?;
        }
        for var in snapshot.variables {
            self.variables.set_scoped(&var.name, var.value, var.scope)?;
        }
        for (name, attrs) in snapshot.highlights {
            self.highlights.define(&name, attrs)?;
        }
        for m in snapshot.mappings {
            self.mappings
                .create_in(m.mode, &m.lhs, m.rhs, Some(m.options))?;
            if !m.enabled {
                self.mappings.set_enabled(m.mode.tag(), &m.lhs, false)?;
            }
        }
        *self.info_mut()? = snapshot.info;
        *self
            .session_id
            .write()
            .map_err(|e| SdkError::Poisoned(e.to_string()))? = doc.session_id;

        debug!(session = %doc.session_id, exported_at = %doc.exported_at, "session imported");
        Ok(())
    }

    /// Delete a window and take it out of every tab that lists it.
    pub fn close_window(&self, window: WindowId) -> SdkResult<bool> {
        while let Some(tab) = self.tabs.tab_of(window)? {
            self.tabs.remove_window(tab, window)?;
        }
        Ok(self.windows.delete(window)?)
    }

    /// Look up a variable by its qualified key (`g:mapleader`).
    pub fn variable(&self, key: &str) -> SdkResult<Option<vom_types::Value>> {
        match Scope::split_qualified(key) {
            Some((scope, name)) => Ok(self.variables.get_scoped(name, scope)?),
            None => Ok(self.variables.get_global(key)?),
        }
    }

    pub fn session_id(&self) -> SdkResult<Uuid> {
        self.session_id
            .read()
            .map(|id| *id)
            .map_err(|e| SdkError::Poisoned(e.to_string()))
    }

    pub fn config(&self) -> &VomConfig {
        &self.config
    }

    pub fn info(&self) -> SdkResult<SessionInfo> {
        self.info
            .read()
            .map(|info| info.clone())
            .map_err(|e| SdkError::Poisoned(e.to_string()))
    }

    /// Change the session info in place.
    pub fn update_info<R>(&self, change: impl FnOnce(&mut SessionInfo) -> R) -> SdkResult<R> {
        Ok(change(&mut *self.info_mut()?))
    }

    fn info_mut(&self) -> SdkResult<std::sync::RwLockWriteGuard<'_, SessionInfo>> {
        self.info
            .write()
            .map_err(|e| SdkError::Poisoned(e.to_string()))
    }

    pub fn registry(&self) -> &InMemoryObjectStore {
        &self.registry
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn buffers(&self) -> &BufferStore {
        &self.buffers
    }

    pub fn windows(&self) -> &WindowStore {
        &self.windows
    }

    pub fn tabs(&self) -> &TabStore {
        &self.tabs
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn highlights(&self) -> &HighlightRegistry {
        &self.highlights
    }

    pub fn autocmds(&self) -> &AutocmdRegistry {
        &self.autocmds
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }
}

impl Default for Vom {
    fn default() -> Self {
        Self::new(VomConfig::default())
    }
}

impl std::fmt::Debug for Vom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vom")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
