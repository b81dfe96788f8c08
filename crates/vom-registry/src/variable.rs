//! Scoped variables (`g:name`, `b:name`, ...) stored directly in the registry.

use std::sync::Arc;

use tracing::{debug, warn};
use vom_store::ObjectStore;
use vom_types::{Attributes, Object, Scope, Value};

use crate::error::{RegistryError, RegistryResult};
use crate::names::{is_reserved, validate_variable_name};

const SOURCE: &str = "variable";

/// Thin scoped accessor over the object registry.
///
/// Scope tags are given as strings (`"g"`, `"buffer"`, ...) because that is
/// how callers spell them; an unknown tag fails with
/// [`RegistryError::InvalidScope`](crate::RegistryError::InvalidScope)
/// before anything is touched.
#[derive(Clone)]
pub struct VariableStore {
    registry: Arc<dyn ObjectStore>,
}

impl VariableStore {
    pub fn new(registry: Arc<dyn ObjectStore>) -> Self {
        Self { registry }
    }

    /// Set `scope:name` to `value`, replacing any previous value.
    pub fn set(&self, name: &str, value: impl Into<Value>, scope: &str) -> RegistryResult<()> {
        let scope: Scope = scope.parse()?;
        self.set_scoped(name, value, scope)
    }

    /// Set a variable in an already-parsed scope.
    ///
    /// Fails with [`RegistryError::ReservedName`] for a key a store mirrors
    /// its records under, or one already held by something other than a
    /// variable, and with [`RegistryError::InvalidValue`] for values holding
    /// a NaN or infinite float.
    pub fn set_scoped(&self, name: &str, value: impl Into<Value>, scope: Scope) -> RegistryResult<()> {
        validate_variable_name(name)?;
        let key = scope.qualify(name);
        if is_reserved(scope, name) {
            warn!(name = %key, "rejected variable over a reserved name");
            return Err(RegistryError::ReservedName(key));
        }
        if let Some(existing) = self.registry.get(&key)? {
            if existing.source() != Some(SOURCE) {
                warn!(name = %key, source = ?existing.source(), "rejected variable over another object");
                return Err(RegistryError::ReservedName(key));
            }
        }
        let value = value.into();
        if !value.is_finite() {
            return Err(RegistryError::InvalidValue {
                name: key,
                reason: "floats must be finite".into(),
            });
        }
        let object = Object::new(key, value, scope, Attributes::new()).with_source(SOURCE);
        debug!(name = %object.name, kind = %object.kind, "variable set");
        self.registry.insert(object)?;
        Ok(())
    }

    /// Shorthand for `set(name, value, "g")`.
    pub fn set_global(&self, name: &str, value: impl Into<Value>) -> RegistryResult<()> {
        self.set_scoped(name, value, Scope::Global)
    }

    /// Read `scope:name`. Returns `Ok(None)` if it is not set.
    pub fn get(&self, name: &str, scope: &str) -> RegistryResult<Option<Value>> {
        let scope: Scope = scope.parse()?;
        self.get_scoped(name, scope)
    }

    pub fn get_scoped(&self, name: &str, scope: Scope) -> RegistryResult<Option<Value>> {
        let object = self.registry.get(&scope.qualify(name))?;
        Ok(object
            .filter(|obj| obj.source() == Some(SOURCE))
            .map(|obj| obj.value))
    }

    pub fn get_global(&self, name: &str) -> RegistryResult<Option<Value>> {
        self.get_scoped(name, Scope::Global)
    }

    /// Unset `scope:name`. Returns `true` if it was set.
    pub fn delete(&self, name: &str, scope: &str) -> RegistryResult<bool> {
        let scope: Scope = scope.parse()?;
        let key = scope.qualify(name);
        match self.registry.get(&key)? {
            Some(obj) if obj.source() == Some(SOURCE) => Ok(self.registry.delete(&key)?),
            _ => Ok(false),
        }
    }

    /// All variables of one scope as `(name, value)`, sorted by name.
    pub fn list(&self, scope: Scope) -> RegistryResult<Vec<(String, Value)>> {
        let prefix = scope.qualify("");
        Ok(self
            .registry
            .list(&prefix)?
            .into_iter()
            .filter(|obj| obj.source() == Some(SOURCE))
            .filter_map(|obj| {
                let name = obj.name.strip_prefix(&prefix)?.to_string();
                Some((name, obj.value))
            })
            .collect())
    }

    /// Every variable as `(scope, name, value)`.
    pub fn all(&self) -> RegistryResult<Vec<(Scope, String, Value)>> {
        Ok(self
            .registry
            .by_source(SOURCE)?
            .into_iter()
            .filter_map(|obj| {
                let (scope, name) = Scope::split_qualified(&obj.name)?;
                Some((scope, name.to_string(), obj.value.clone()))
            })
            .collect())
    }

    /// Unset every variable in every scope.
    pub fn clear(&self) -> RegistryResult<()> {
        for obj in self.registry.by_source(SOURCE)? {
            self.registry.delete(&obj.name)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableStore").finish_non_exhaustive()
    }
}
