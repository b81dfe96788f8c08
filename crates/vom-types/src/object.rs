use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scope::Scope;
use crate::value::{Value, ValueKind};

/// Free-form key/value annotations attached to an object.
pub type Attributes = BTreeMap<String, Value>;

/// Metadata key naming the store that owns an object's mirror.
pub const SOURCE_KEY: &str = "source";

/// A named, scoped, typed entry in the object registry.
///
/// `kind` is inferred from `value` when the object is created and is not
/// re-inferred on later updates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub kind: ValueKind,
    pub value: Value,
    pub scope: Scope,
    pub attributes: Attributes,
    pub metadata: Attributes,
}

impl Object {
    pub fn new(name: impl Into<String>, value: Value, scope: Scope, attributes: Attributes) -> Self {
        Self {
            name: name.into(),
            kind: value.kind(),
            value,
            scope,
            attributes,
            metadata: Attributes::new(),
        }
    }

    /// Tag the object with the store that created it.
    pub fn with_source(mut self, source: &str) -> Self {
        self.metadata
            .insert(SOURCE_KEY.to_string(), Value::String(source.to_string()));
        self
    }

    /// The owning store recorded by [`Object::with_source`], if any.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Build an [`Attributes`] map from `(key, value)` pairs.
pub fn attributes<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_inferred_at_construction() {
        let obj = Object::new("g:answer", Value::from(42), Scope::Global, Attributes::new());
        assert_eq!(obj.kind, ValueKind::Number);
        assert!(obj.metadata.is_empty());
    }

    #[test]
    fn source_tag() {
        let obj = Object::new("b:buffer_1", Value::lines(["x"]), Scope::Buffer, Attributes::new())
            .with_source("buffer");
        assert_eq!(obj.source(), Some("buffer"));
    }

    #[test]
    fn attribute_builder() {
        let attrs = attributes([("modified", Value::from(false)), ("number", Value::from(1))]);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["number"], Value::Number(1));
    }
}
