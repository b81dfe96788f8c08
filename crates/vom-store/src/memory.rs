//! In-memory object registry.
//!
//! [`InMemoryObjectStore`] keeps every object in a `BTreeMap` behind a
//! `RwLock`, so listing is naturally ordered by name.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;
use vom_types::{Attributes, Object, Value};

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// `BTreeMap`-based implementation of [`ObjectStore`].
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, Object>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    fn read_map(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, Object>>> {
        self.objects
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write_map(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, Object>>> {
        self.objects
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn insert(&self, object: Object) -> StoreResult<Object> {
        if object.name.is_empty() {
            return Err(StoreError::InvalidName(object.name));
        }
        debug!(name = %object.name, kind = %object.kind, scope = %object.scope, "object stored");
        let mut map = self.write_map()?;
        map.insert(object.name.clone(), object.clone());
        Ok(object)
    }

    fn get(&self, name: &str) -> StoreResult<Option<Object>> {
        Ok(self.read_map()?.get(name).cloned())
    }

    fn update(
        &self,
        name: &str,
        value: Value,
        attributes: Option<Attributes>,
    ) -> StoreResult<Option<Object>> {
        let mut map = self.write_map()?;
        let Some(obj) = map.get_mut(name) else {
            return Ok(None);
        };
        obj.value = value;
        if let Some(attributes) = attributes {
            obj.attributes.extend(attributes);
        }
        Ok(Some(obj.clone()))
    }

    fn set_metadata(&self, name: &str, key: &str, value: Value) -> StoreResult<bool> {
        let mut map = self.write_map()?;
        match map.get_mut(name) {
            Some(obj) => {
                obj.metadata.insert(key.to_string(), value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, name: &str) -> StoreResult<bool> {
        let removed = self.write_map()?.remove(name).is_some();
        if removed {
            debug!(name, "object deleted");
        }
        Ok(removed)
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<Object>> {
        let map = self.read_map()?;
        Ok(map
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    fn clear(&self) -> StoreResult<()> {
        let mut map = self.write_map()?;
        debug!(count = map.len(), "registry cleared");
        map.clear();
        Ok(())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.read_map()?.len())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.objects.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vom_types::{attributes, Scope, ValueKind};

    fn store_with(names: &[&str]) -> InMemoryObjectStore {
        let store = InMemoryObjectStore::new();
        for name in names {
            store
                .create(name, Value::from(*name), Scope::Global, Attributes::new())
                .unwrap();
        }
        store
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn create_infers_kind() {
        let store = InMemoryObjectStore::new();
        let obj = store
            .create("g:count", Value::from(3), Scope::Global, Attributes::new())
            .unwrap();
        assert_eq!(obj.kind, ValueKind::Number);

        let read = store.get("g:count").unwrap().expect("should exist");
        assert_eq!(read.value, Value::Number(3));
        assert_eq!(read.scope, Scope::Global);
    }

    #[test]
    fn null_value_is_unknown_kind() {
        let store = InMemoryObjectStore::new();
        let obj = store
            .create("g:nothing", Value::Null, Scope::Global, Attributes::new())
            .unwrap();
        assert_eq!(obj.kind, ValueKind::Unknown);
    }

    #[test]
    fn create_overwrites_existing() {
        let store = InMemoryObjectStore::new();
        store
            .create("g:x", Value::from(1), Scope::Global, Attributes::new())
            .unwrap();
        store
            .create("g:x", Value::from("two"), Scope::Global, Attributes::new())
            .unwrap();

        let read = store.get("g:x").unwrap().unwrap();
        assert_eq!(read.value, Value::from("two"));
        assert_eq!(read.kind, ValueKind::String);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn empty_name_is_rejected() {
        let store = InMemoryObjectStore::new();
        let err = store
            .create("", Value::Null, Scope::Global, Attributes::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn get_missing_returns_none() {
        let store = InMemoryObjectStore::new();
        assert!(store.get("g:nope").unwrap().is_none());
    }

    #[test]
    fn update_replaces_value_and_merges_attributes() {
        let store = InMemoryObjectStore::new();
        store
            .create(
                "b:buffer_1",
                Value::lines(Vec::<String>::new()),
                Scope::Buffer,
                attributes([("modified", false), ("listed", true)]),
            )
            .unwrap();

        let updated = store
            .update(
                "b:buffer_1",
                Value::lines(["a"]),
                Some(attributes([("modified", true)])),
            )
            .unwrap()
            .expect("should exist");
        assert_eq!(updated.value, Value::lines(["a"]));
        assert_eq!(updated.attributes["modified"], Value::Boolean(true));
        assert_eq!(updated.attributes["listed"], Value::Boolean(true));
    }

    #[test]
    fn update_keeps_kind_from_creation() {
        let store = InMemoryObjectStore::new();
        store
            .create("g:v", Value::from(1), Scope::Global, Attributes::new())
            .unwrap();
        let updated = store.update("g:v", Value::from("s"), None).unwrap().unwrap();
        assert_eq!(updated.kind, ValueKind::Number);
    }

    #[test]
    fn update_missing_returns_none() {
        let store = InMemoryObjectStore::new();
        assert!(store.update("g:ghost", Value::Null, None).unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn delete_reports_presence() {
        let store = store_with(&["g:a"]);
        assert!(store.delete("g:a").unwrap());
        assert!(!store.delete("g:a").unwrap());
        assert!(!store.contains("g:a").unwrap());
    }

    #[test]
    fn metadata_on_existing_only() {
        let store = store_with(&["g:a"]);
        assert!(store.set_metadata("g:a", "doc", Value::from("hi")).unwrap());
        assert!(!store.set_metadata("g:b", "doc", Value::from("hi")).unwrap());
        let obj = store.get("g:a").unwrap().unwrap();
        assert_eq!(obj.metadata["doc"], Value::from("hi"));
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    #[test]
    fn list_by_prefix_is_sorted() {
        let store = store_with(&["g:b", "b:buffer_1", "g:a", "w:window_1"]);
        let names: Vec<String> = store
            .list("g:")
            .unwrap()
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, vec!["g:a", "g:b"]);
        assert_eq!(store.list("").unwrap().len(), 4);
        assert!(store.list("t:").unwrap().is_empty());
    }

    #[test]
    fn by_source_filters_on_metadata() {
        let store = InMemoryObjectStore::new();
        store
            .insert(
                Object::new("g:x", Value::from(1), Scope::Global, Attributes::new())
                    .with_source("variable"),
            )
            .unwrap();
        store
            .insert(
                Object::new("g:command_w", Value::Null, Scope::Global, Attributes::new())
                    .with_source("command"),
            )
            .unwrap();

        let vars = store.by_source("variable").unwrap();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].name, "g:x");
    }

    #[test]
    fn clear_removes_everything() {
        let store = store_with(&["g:a", "g:b"]);
        store.clear().unwrap();
        assert_eq!(store.len().unwrap(), 0);
        assert!(store.get("g:a").unwrap().is_none());
    }
}
