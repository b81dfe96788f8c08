//! Named callables invoked by name, like `:call Greet('x')`.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;
use vom_store::ObjectStore;
use vom_types::{attributes, Object, Scope, Value};

use crate::error::{RegistryError, RegistryResult};
use crate::lock::{read, write};
use crate::names::validate_callable_name;

const SOURCE: &str = "function";

/// A unit of code that can be registered as a function.
///
/// Implementors describe themselves: the registry uses [`name`](Self::name)
/// when no explicit name is given, and mirrors [`params`](Self::params) and
/// [`doc`](Self::doc) into the object registry.
pub trait Callable: Send + Sync {
    fn name(&self) -> &str;

    fn params(&self) -> &[String] {
        &[]
    }

    fn doc(&self) -> Option<&str> {
        None
    }

    fn call(&self, args: &[Value]) -> Value;
}

type Body = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// A [`Callable`] backed by a Rust closure.
#[derive(Clone)]
pub struct NativeFunction {
    name: String,
    params: Vec<String>,
    doc: Option<String>,
    body: Body,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            doc: None,
            body: Arc::new(body),
        }
    }

    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

impl Callable for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[String] {
        &self.params
    }

    fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    fn call(&self, args: &[Value]) -> Value {
        (self.body)(args)
    }
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Functions by name, mirrored as `g:function_<name>` funcrefs.
pub struct FunctionRegistry {
    registry: Arc<dyn ObjectStore>,
    table: RwLock<BTreeMap<String, Arc<dyn Callable>>>,
}

impl FunctionRegistry {
    pub fn new(registry: Arc<dyn ObjectStore>) -> Self {
        Self {
            registry,
            table: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn registry_key(name: &str) -> String {
        Scope::Global.qualify(&format!("function_{name}"))
    }

    /// Register `callable` under `name`, or under its own name if `None`.
    ///
    /// Re-registering a name replaces the previous function. Returns the name
    /// actually used.
    pub fn register(&self, callable: Arc<dyn Callable>, name: Option<&str>) -> RegistryResult<String> {
        let name = name.unwrap_or_else(|| callable.name()).to_string();
        validate_callable_name(&name)?;

        let params: Vec<Value> = callable.params().iter().map(|p| Value::from(p.as_str())).collect();
        let object = Object::new(
            Self::registry_key(&name),
            Value::Funcref(name.clone()),
            Scope::Global,
            attributes([
                ("args", Value::List(params)),
                ("doc", Value::from(callable.doc())),
            ]),
        )
        .with_source(SOURCE);

        let mut table = write(&self.table)?;
        self.registry.insert(object)?;
        table.insert(name.clone(), callable);
        debug!(function = %name, "function registered");
        Ok(name)
    }

    /// Invoke a registered function.
    pub fn call(&self, name: &str, args: &[Value]) -> RegistryResult<Value> {
        let callable = read(&self.table)?
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownFunction(name.to_string()))?;
        Ok(callable.call(args))
    }

    pub fn contains(&self, name: &str) -> RegistryResult<bool> {
        Ok(read(&self.table)?.contains_key(name))
    }

    /// Parameter names of a registered function.
    pub fn params(&self, name: &str) -> RegistryResult<Option<Vec<String>>> {
        Ok(read(&self.table)?.get(name).map(|f| f.params().to_vec()))
    }

    pub fn names(&self) -> RegistryResult<Vec<String>> {
        Ok(read(&self.table)?.keys().cloned().collect())
    }

    pub fn unregister(&self, name: &str) -> RegistryResult<bool> {
        let mut table = write(&self.table)?;
        if table.remove(name).is_none() {
            return Ok(false);
        }
        self.registry.delete(&Self::registry_key(name))?;
        debug!(function = %name, "function unregistered");
        Ok(true)
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

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.table.read().map(|t| t.len()).unwrap_or_default();
        f.debug_struct("FunctionRegistry")
            .field("functions", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vom_store::InMemoryObjectStore;
    use vom_types::ValueKind;

    fn setup() -> (Arc<InMemoryObjectStore>, Arc<FunctionRegistry>) {
        let registry = Arc::new(InMemoryObjectStore::new());
        (registry.clone(), Arc::new(FunctionRegistry::new(registry)))
    }

    fn greet() -> Arc<dyn Callable> {
        Arc::new(
            NativeFunction::new("Greet", |args: &[Value]| {
                let who = args.first().and_then(Value::as_str).unwrap_or("world");
                Value::from(format!("hello, {who}"))
            })
            .with_params(["who"])
            .with_doc("Say hello."),
        )
    }

    #[test]
    fn register_uses_callable_name() {
        let (registry, functions) = setup();
        let name = functions.register(greet(), None).unwrap();
        assert_eq!(name, "Greet");

        let obj = registry.get("g:function_Greet").unwrap().expect("mirrored");
        assert_eq!(obj.kind, ValueKind::Funcref);
        assert_eq!(obj.value, Value::Funcref("Greet".into()));
        assert_eq!(obj.attributes["args"], Value::lines(["who"]));
        assert_eq!(obj.attributes["doc"], Value::from("Say hello."));
    }

    #[test]
    fn register_under_explicit_name() {
        let (_, functions) = setup();
        functions.register(greet(), Some("Hi")).unwrap();
        assert!(functions.contains("Hi").unwrap());
        assert!(!functions.contains("Greet").unwrap());
    }

    #[test]
    fn call_by_name() {
        let (_, functions) = setup();
        functions.register(greet(), None).unwrap();
        let out = functions.call("Greet", &[Value::from("vim")]).unwrap();
        assert_eq!(out, Value::from("hello, vim"));
        assert_eq!(functions.params("Greet").unwrap(), Some(vec!["who".to_string()]));
    }

    #[test]
    fn call_unknown_function() {
        let (_, functions) = setup();
        let err = functions.call("Nope", &[]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownFunction(ref n) if n == "Nope"));
    }

    #[test]
    fn reregister_overwrites() {
        let (_, functions) = setup();
        functions.register(greet(), None).unwrap();
        functions
            .register(Arc::new(NativeFunction::new("Greet", |_: &[Value]| Value::Number(7))), None)
            .unwrap();
        assert_eq!(functions.call("Greet", &[]).unwrap(), Value::Number(7));
        assert_eq!(functions.names().unwrap(), vec!["Greet".to_string()]);
    }

    #[test]
    fn invalid_name_is_rejected() {
        let (registry, functions) = setup();
        assert!(functions.register(greet(), Some("s:Local")).is_err());
        assert!(registry.is_empty().unwrap());
    }

    #[test]
    fn callbacks_may_reenter_registry() {
        let (_, functions) = setup();
        functions.register(greet(), None).unwrap();
        let inner = functions.clone();
        functions
            .register(
                Arc::new(NativeFunction::new("Twice", move |args: &[Value]| {
                    let once = inner.call("Greet", args).unwrap_or_default();
                    Value::lines([once.to_string(), once.to_string()])
                })),
                None,
            )
            .unwrap();
        let out = functions.call("Twice", &[]).unwrap();
        assert_eq!(out.as_list().map(|l| l.len()), Some(2));
    }

    #[test]
    fn unregister_and_clear() {
        let (registry, functions) = setup();
        functions.register(greet(), None).unwrap();
        assert!(functions.unregister("Greet").unwrap());
        assert!(!functions.unregister("Greet").unwrap());
        assert!(registry.is_empty().unwrap());

        functions.register(greet(), None).unwrap();
        functions.clear().unwrap();
        assert!(functions.names().unwrap().is_empty());
        assert!(registry.is_empty().unwrap());
    }
}
