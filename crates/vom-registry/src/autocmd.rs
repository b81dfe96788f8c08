//! Autocommands: callbacks run when an event fires for a matching file.
//!
//! Entries are kept per event in registration order, which is also dispatch
//! order. Each entry is mirrored as `g:autocmd_<event>_<n>` with `n`
//! counting from 1.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;
use vom_store::ObjectStore;
use vom_types::{attributes, Attributes, Object, Scope, Value};

use crate::error::RegistryResult;
use crate::lock::{read, write};
use crate::names::validate_word;
use crate::pattern::Pattern;

const SOURCE: &str = "autocmd";

/// Option key that makes an entry fire at most once.
pub const ONCE: &str = "once";

/// What an autocommand callback gets to see about the event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventContext {
    pub filename: String,
    pub data: Attributes,
}

impl EventContext {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            data: Attributes::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

pub type AutocmdCallback = Arc<dyn Fn(&EventContext) -> Value + Send + Sync>;

/// Data-only view of one autocommand entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutocmdInfo {
    pub event: String,
    pub pattern: String,
    pub options: Attributes,
    pub enabled: bool,
}

struct Entry {
    pattern: Pattern,
    callback: AutocmdCallback,
    options: Attributes,
    enabled: bool,
}

impl Entry {
    fn once(&self) -> bool {
        self.options.get(ONCE).is_some_and(Value::is_truthy)
    }

    fn to_object(&self, event: &str, index: usize) -> Object {
        Object::new(
            AutocmdRegistry::registry_key(event, index),
            Value::from(self.pattern.as_str()),
            Scope::Global,
            attributes([
                ("event", Value::from(event)),
                ("pattern", Value::from(self.pattern.as_str())),
                ("options", Value::Mapping(self.options.clone())),
                ("enabled", Value::from(self.enabled)),
            ]),
        )
        .with_source(SOURCE)
    }
}

/// Per-event autocommand lists.
pub struct AutocmdRegistry {
    registry: Arc<dyn ObjectStore>,
    table: RwLock<BTreeMap<String, Vec<Entry>>>,
}

impl AutocmdRegistry {
    pub fn new(registry: Arc<dyn ObjectStore>) -> Self {
        Self {
            registry,
            table: RwLock::new(BTreeMap::new()),
        }
    }

    /// Mirror key of the entry at 0-based `index` of `event`.
    pub fn registry_key(event: &str, index: usize) -> String {
        Scope::Global.qualify(&format!("autocmd_{event}_{}", index + 1))
    }

    /// Append an autocommand for `event` and return its 0-based index.
    ///
    /// The pattern is compiled here; a malformed one fails with
    /// [`RegistryError::InvalidPattern`](crate::RegistryError::InvalidPattern)
    /// and nothing is registered.
    pub fn register(
        &self,
        event: &str,
        pattern: &str,
        callback: impl Fn(&EventContext) -> Value + Send + Sync + 'static,
        options: Option<Attributes>,
    ) -> RegistryResult<usize> {
        validate_word(event)?;
        let entry = Entry {
            pattern: Pattern::new(pattern)?,
            callback: Arc::new(callback),
            options: options.unwrap_or_default(),
            enabled: true,
        };

        let mut table = write(&self.table)?;
        let entries = table.entry(event.to_string()).or_default();
        let index = entries.len();
        self.registry.insert(entry.to_object(event, index))?;
        entries.push(entry);
        debug!(event = %event, pattern = %pattern, index, "autocmd registered");
        Ok(index)
    }

    /// Fire `event` for `ctx.filename`.
    ///
    /// Every enabled entry whose pattern matches is invoked in registration
    /// order and its return value collected. An event with no entries yields
    /// an empty list.
    pub fn trigger(&self, event: &str, ctx: &EventContext) -> RegistryResult<Vec<Value>> {
        let callbacks = {
            let mut table = write(&self.table)?;
            let Some(entries) = table.get_mut(event) else {
                return Ok(Vec::new());
            };
            let mut callbacks = Vec::new();
            for (index, entry) in entries.iter_mut().enumerate() {
                if !entry.enabled || !entry.pattern.matches(&ctx.filename) {
                    continue;
                }
                if entry.once() {
                    entry.enabled = false;
                    self.registry.insert(entry.to_object(event, index))?;
                }
                callbacks.push(entry.callback.clone());
            }
            callbacks
        };
        debug!(event = %event, file = %ctx.filename, matched = callbacks.len(), "autocmd triggered");
        Ok(callbacks.iter().map(|cb| cb(ctx)).collect())
    }

    /// Enable or disable the entry at 0-based `index`.
    ///
    /// Returns `Ok(false)` if there is no such entry.
    pub fn set_enabled(&self, event: &str, index: usize, enabled: bool) -> RegistryResult<bool> {
        let mut table = write(&self.table)?;
        let Some(entry) = table.get_mut(event).and_then(|e| e.get_mut(index)) else {
            return Ok(false);
        };
        entry.enabled = enabled;
        self.registry.insert(entry.to_object(event, index))?;
        Ok(true)
    }

    pub fn entries(&self, event: &str) -> RegistryResult<Vec<AutocmdInfo>> {
        let table = read(&self.table)?;
        Ok(table
            .get(event)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| AutocmdInfo {
                        event: event.to_string(),
                        pattern: e.pattern.as_str().to_string(),
                        options: e.options.clone(),
                        enabled: e.enabled,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Events that have at least one entry.
    pub fn events(&self) -> RegistryResult<Vec<String>> {
        Ok(read(&self.table)?
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(event, _)| event.clone())
            .collect())
    }

    /// Drop every entry of one event. Returns how many were removed.
    pub fn clear_event(&self, event: &str) -> RegistryResult<usize> {
        let mut table = write(&self.table)?;
        let Some(entries) = table.remove(event) else {
            return Ok(0);
        };
        for index in 0..entries.len() {
            self.registry.delete(&Self::registry_key(event, index))?;
        }
        debug!(event = %event, removed = entries.len(), "autocmds cleared");
        Ok(entries.len())
    }

    pub fn clear(&self) -> RegistryResult<()> {
        let mut table = write(&self.table)?;
        for (event, entries) in table.iter() {
            for index in 0..entries.len() {
                self.registry.delete(&Self::registry_key(event, index))?;
            }
        }
        table.clear();
        Ok(())
    }
}

impl std::fmt::Debug for AutocmdRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutocmdRegistry").finish_non_exhaustive()
    }
}
