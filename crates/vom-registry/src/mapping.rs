//! Key mappings, keyed by `(mode, lhs)`.
//!
//! A mapping's right-hand side is either a key sequence (what `:nmap` stores)
//! or a callback. Writing the same `(mode, lhs)` twice keeps the second one.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;
use vom_store::ObjectStore;
use vom_types::{attributes, Attributes, MapMode, Object, Scope, Value};

use crate::error::RegistryResult;
use crate::lock::{read, write};
use crate::names::validate_lhs;

const SOURCE: &str = "mapping";

pub type MappingCallback = Arc<dyn Fn() -> Value + Send + Sync>;

/// Right-hand side of a mapping.
#[derive(Clone)]
pub enum MapTarget {
    Keys(String),
    Callback(MappingCallback),
}

impl MapTarget {
    pub fn callback(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        MapTarget::Callback(Arc::new(f))
    }

    pub fn keys(&self) -> Option<&str> {
        match self {
            MapTarget::Keys(keys) => Some(keys),
            MapTarget::Callback(_) => None,
        }
    }

    pub fn is_callback(&self) -> bool {
        matches!(self, MapTarget::Callback(_))
    }
}

impl std::fmt::Debug for MapTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapTarget::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            MapTarget::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl PartialEq for MapTarget {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MapTarget::Keys(a), MapTarget::Keys(b)) => a == b,
            (MapTarget::Callback(a), MapTarget::Callback(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for MapTarget {
    fn from(keys: &str) -> Self {
        MapTarget::Keys(keys.to_string())
    }
}

impl From<String> for MapTarget {
    fn from(keys: String) -> Self {
        MapTarget::Keys(keys)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mapping {
    pub mode: MapMode,
    pub lhs: String,
    pub rhs: MapTarget,
    pub options: Attributes,
    pub enabled: bool,
}

impl Mapping {
    fn to_object(&self) -> Object {
        let value = match &self.rhs {
            MapTarget::Keys(keys) => Value::from(keys.as_str()),
            MapTarget::Callback(_) => Value::Null,
        };
        Object::new(
            MappingTable::registry_key(self.mode, &self.lhs),
            value.clone(),
            Scope::Global,
            attributes([
                ("mode", Value::from(self.mode.long_name())),
                ("lhs", Value::from(self.lhs.as_str())),
                ("rhs", value),
                ("callback", Value::from(self.rhs.is_callback())),
                ("options", Value::Mapping(self.options.clone())),
                ("enabled", Value::from(self.enabled)),
            ]),
        )
        .with_source(SOURCE)
    }
}

/// Every key mapping of every mode.
pub struct MappingTable {
    registry: Arc<dyn ObjectStore>,
    table: RwLock<BTreeMap<(MapMode, String), Mapping>>,
}

impl MappingTable {
    pub fn new(registry: Arc<dyn ObjectStore>) -> Self {
        Self {
            registry,
            table: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn registry_key(mode: MapMode, lhs: &str) -> String {
        Scope::Global.qualify(&format!("mapping_{}_{lhs}", mode.tag()))
    }

    /// Map `lhs` to `rhs` in the mode named by `mode` (`"n"`, `"normal"`, ...).
    ///
    /// An unknown mode fails with
    /// [`RegistryError::InvalidMode`](crate::RegistryError::InvalidMode) and
    /// stores nothing.
    pub fn create(
        &self,
        mode: &str,
        lhs: &str,
        rhs: impl Into<MapTarget>,
        options: Option<Attributes>,
    ) -> RegistryResult<()> {
        let mode: MapMode = mode.parse()?;
        self.create_in(mode, lhs, rhs, options)
    }

    pub fn create_in(
        &self,
        mode: MapMode,
        lhs: &str,
        rhs: impl Into<MapTarget>,
        options: Option<Attributes>,
    ) -> RegistryResult<()> {
        validate_lhs(lhs)?;
        let mapping = Mapping {
            mode,
            lhs: lhs.to_string(),
            rhs: rhs.into(),
            options: options.unwrap_or_default(),
            enabled: true,
        };
        let mut table = write(&self.table)?;
        self.registry.insert(mapping.to_object())?;
        debug!(mode = %mode, lhs = %lhs, rhs = ?mapping.rhs, "mapping created");
        table.insert((mode, lhs.to_string()), mapping);
        Ok(())
    }

    pub fn get(&self, mode: &str, lhs: &str) -> RegistryResult<Option<Mapping>> {
        let mode: MapMode = mode.parse()?;
        Ok(read(&self.table)?.get(&(mode, lhs.to_string())).cloned())
    }

    pub fn delete(&self, mode: &str, lhs: &str) -> RegistryResult<bool> {
        let mode: MapMode = mode.parse()?;
        let mut table = write(&self.table)?;
        if table.remove(&(mode, lhs.to_string())).is_none() {
            return Ok(false);
        }
        self.registry.delete(&Self::registry_key(mode, lhs))?;
        debug!(mode = %mode, lhs = %lhs, "mapping deleted");
        Ok(true)
    }

    /// Mappings of one mode, sorted by left-hand side.
    pub fn list(&self, mode: &str) -> RegistryResult<Vec<Mapping>> {
        let mode: MapMode = mode.parse()?;
        Ok(read(&self.table)?
            .values()
            .filter(|m| m.mode == mode)
            .cloned()
            .collect())
    }

    pub fn all(&self) -> RegistryResult<Vec<Mapping>> {
        Ok(read(&self.table)?.values().cloned().collect())
    }

    /// Returns `Ok(false)` if there is no such mapping.
    pub fn set_enabled(&self, mode: &str, lhs: &str, enabled: bool) -> RegistryResult<bool> {
        let mode: MapMode = mode.parse()?;
        let mut table = write(&self.table)?;
        let Some(mapping) = table.get_mut(&(mode, lhs.to_string())) else {
            return Ok(false);
        };
        mapping.enabled = enabled;
        self.registry.insert(mapping.to_object())?;
        Ok(true)
    }

    /// Fire a mapping as if its keys were typed.
    ///
    /// A key-sequence mapping yields its keys as a string; a callback mapping
    /// yields whatever the callback returns. Missing or disabled mappings
    /// yield `Ok(None)`.
    pub fn invoke(&self, mode: &str, lhs: &str) -> RegistryResult<Option<Value>> {
        let mode: MapMode = mode.parse()?;
        let target = {
            let table = read(&self.table)?;
            match table.get(&(mode, lhs.to_string())) {
                Some(m) if m.enabled => m.rhs.clone(),
                _ => return Ok(None),
            }
        };
        Ok(Some(match target {
            MapTarget::Keys(keys) => Value::String(keys),
            MapTarget::Callback(cb) => cb(),
        }))
    }

    pub fn clear(&self) -> RegistryResult<()> {
        let mut table = write(&self.table)?;
        for (mode, lhs) in table.keys() {
            self.registry.delete(&Self::registry_key(*mode, lhs))?;
        }
        table.clear();
        Ok(())
    }
}

impl std::fmt::Debug for MappingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingTable").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use vom_store::InMemoryObjectStore;

    fn setup() -> (Arc<InMemoryObjectStore>, Arc<MappingTable>) {
        let registry = Arc::new(InMemoryObjectStore::new());
        (registry.clone(), Arc::new(MappingTable::new(registry)))
    }

    #[test]
    fn last_write_wins() {
        let (registry, mappings) = setup();
        mappings.create("n", "<leader>w", ":w<CR>", None).unwrap();
        mappings.create("normal", "<leader>w", ":wa<CR>", None).unwrap();

        let m = mappings.get("n", "<leader>w").unwrap().unwrap();
        assert_eq!(m.rhs, MapTarget::from(":wa<CR>"));
        assert_eq!(mappings.list("n").unwrap().len(), 1);

        let obj = registry.get("g:mapping_n_<leader>w").unwrap().unwrap();
        assert_eq!(obj.value, Value::from(":wa<CR>"));
        assert_eq!(obj.attributes["mode"], Value::from("normal"));
    }

    #[test]
    fn modes_are_separate() {
        let (_, mappings) = setup();
        mappings.create("n", "jk", "<Nop>", None).unwrap();
        mappings.create("i", "jk", "<Esc>", None).unwrap();
        assert_eq!(mappings.get("i", "jk").unwrap().unwrap().rhs.keys(), Some("<Esc>"));
        assert_eq!(mappings.get("v", "jk").unwrap(), None);
        assert_eq!(mappings.all().unwrap().len(), 2);
    }

    #[test]
    fn invalid_mode_stores_nothing() {
        let (registry, mappings) = setup();
        let err = mappings.create("bogus", "x", "y", None).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidMode(ref m) if m == "bogus"));
        assert!(registry.is_empty().unwrap());
        assert!(mappings.get("bogus", "x").is_err());
    }

    #[test]
    fn callback_targets() {
        let (registry, mappings) = setup();
        mappings
            .create("n", "<F5>", MapTarget::callback(|| Value::from("ran")), None)
            .unwrap();
        assert_eq!(mappings.invoke("n", "<F5>").unwrap(), Some(Value::from("ran")));

        let obj = registry.get("g:mapping_n_<F5>").unwrap().unwrap();
        assert_eq!(obj.attributes["callback"], Value::Boolean(true));
    }

    #[test]
    fn invoke_keys_and_disabled() {
        let (_, mappings) = setup();
        mappings
            .create("x", "gq", "=", Some(attributes([("silent", true)])))
            .unwrap();
        assert_eq!(mappings.invoke("x", "gq").unwrap(), Some(Value::from("=")));

        assert!(mappings.set_enabled("x", "gq", false).unwrap());
        assert_eq!(mappings.invoke("x", "gq").unwrap(), None);
        assert!(!mappings.set_enabled("x", "zz", false).unwrap());
        assert_eq!(mappings.invoke("x", "zz").unwrap(), None);
    }

    #[test]
    fn delete_and_clear() {
        let (registry, mappings) = setup();
        mappings.create("n", "a", "b", None).unwrap();
        mappings.create("o", "c", "d", None).unwrap();
        assert!(mappings.delete("n", "a").unwrap());
        assert!(!mappings.delete("n", "a").unwrap());
        assert!(!registry.contains("g:mapping_n_a").unwrap());

        mappings.clear().unwrap();
        assert!(mappings.all().unwrap().is_empty());
        assert!(registry.is_empty().unwrap());
    }

    #[test]
    fn empty_lhs_is_rejected() {
        let (_, mappings) = setup();
        assert!(matches!(
            mappings.create("n", "", "x", None).unwrap_err(),
            RegistryError::InvalidName { .. }
        ));
    }
}
