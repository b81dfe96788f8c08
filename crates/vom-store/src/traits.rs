use vom_types::{Attributes, Object, Scope, Value};

use crate::error::StoreResult;

/// Registry of named, scoped, typed objects.
///
/// Implementations must be thread-safe (`Send + Sync`): every typed store
/// holds the registry behind an `Arc` and mirrors into it from `&self`.
/// Names are scope-qualified keys such as `g:mapleader` or `w:window_2`.
pub trait ObjectStore: Send + Sync {
    /// Store `object` under its name, replacing any existing entry.
    ///
    /// Returns the stored object.
    fn insert(&self, object: Object) -> StoreResult<Object>;

    /// Read an object by name.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn get(&self, name: &str) -> StoreResult<Option<Object>>;

    /// Replace the value of an existing object and merge `attributes` into
    /// its attribute map. The kind is left as inferred at creation.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn update(
        &self,
        name: &str,
        value: Value,
        attributes: Option<Attributes>,
    ) -> StoreResult<Option<Object>>;

    /// Set one metadata entry on an existing object.
    ///
    /// Returns `Ok(false)` if the object does not exist.
    fn set_metadata(&self, name: &str, key: &str, value: Value) -> StoreResult<bool>;

    /// Delete an object by name. Returns `true` if it existed.
    fn delete(&self, name: &str) -> StoreResult<bool>;

    /// All objects whose name starts with `prefix`, sorted by name.
    ///
    /// Pass `""` to list everything, `"b:"` for buffer-scoped objects only.
    fn list(&self, prefix: &str) -> StoreResult<Vec<Object>>;

    /// Remove every object.
    fn clear(&self) -> StoreResult<()>;

    /// Number of objects currently held.
    fn len(&self) -> StoreResult<usize>;

    /// Create an object from parts, inferring its kind from `value`.
    fn create(
        &self,
        name: &str,
        value: Value,
        scope: Scope,
        attributes: Attributes,
    ) -> StoreResult<Object> {
        self.insert(Object::new(name, value, scope, attributes))
    }

    /// Returns `true` if an object with this name exists.
    fn contains(&self, name: &str) -> StoreResult<bool> {
        Ok(self.get(name)?.is_some())
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All objects mirrored by the store named `source`, sorted by name.
    fn by_source(&self, source: &str) -> StoreResult<Vec<Object>> {
        let all = self.list("")?;
        Ok(all
            .into_iter()
            .filter(|obj| obj.source() == Some(source))
            .collect())
    }
}
