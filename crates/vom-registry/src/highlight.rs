//! Highlight groups (`:hi Comment guifg=#888888`).

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;
use vom_store::ObjectStore;
use vom_types::{Attributes, Object, Scope, Value};

use crate::error::RegistryResult;
use crate::lock::{read, write};
use crate::names::validate_word;

const SOURCE: &str = "highlight";

/// GUI keys that every highlight mirror carries, empty when unset.
const GUI_KEYS: [&str; 3] = ["gui", "guifg", "guibg"];

/// Highlight groups by name, mirrored as `g:highlight_<name>`.
///
/// Attribute keys are free-form; nothing checks that `ctermfg` or `guisp`
/// mean anything.
pub struct HighlightRegistry {
    registry: Arc<dyn ObjectStore>,
    table: RwLock<BTreeMap<String, Attributes>>,
}

impl HighlightRegistry {
    pub fn new(registry: Arc<dyn ObjectStore>) -> Self {
        Self {
            registry,
            table: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn registry_key(name: &str) -> String {
        Scope::Global.qualify(&format!("highlight_{name}"))
    }

    /// Define (or redefine) group `name` with exactly `attrs`.
    pub fn define(&self, name: &str, attrs: Attributes) -> RegistryResult<()> {
        validate_word(name)?;
        let mut mirrored = attrs.clone();
        mirrored.insert("name".into(), Value::from(name));
        for key in GUI_KEYS {
            mirrored
                .entry(key.to_string())
                .or_insert_with(|| Value::from(""));
        }
        let object = Object::new(
            Self::registry_key(name),
            Value::Mapping(attrs.clone()),
            Scope::Global,
            mirrored,
        )
        .with_source(SOURCE);

        let mut table = write(&self.table)?;
        self.registry.insert(object)?;
        debug!(group = %name, keys = attrs.len(), "highlight defined");
        table.insert(name.to_string(), attrs);
        Ok(())
    }

    pub fn get(&self, name: &str) -> RegistryResult<Option<Attributes>> {
        Ok(read(&self.table)?.get(name).cloned())
    }

    pub fn names(&self) -> RegistryResult<Vec<String>> {
        Ok(read(&self.table)?.keys().cloned().collect())
    }

    /// Every group with its attributes, sorted by name.
    pub fn all(&self) -> RegistryResult<Vec<(String, Attributes)>> {
        Ok(read(&self.table)?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    pub fn clear(&self) -> RegistryResult<()> {
        let mut table = write(&self.table)?;
        for name in table.keys() {
            self.registry.delete(&Self::registry_key(name))?;
        }
        table.clear();
        Ok(())
    }
}

impl std::fmt::Debug for HighlightRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightRegistry").finish_non_exhaustive()
    }
}
