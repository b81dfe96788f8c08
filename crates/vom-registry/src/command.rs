//! User commands (`:command Greet ...`) with per-command usage counts.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;
use vom_store::ObjectStore;
use vom_types::{attributes, Attributes, Object, Scope, Value};

use crate::error::{RegistryError, RegistryResult};
use crate::lock::{read, write};
use crate::names::validate_callable_name;

const SOURCE: &str = "command";

/// The code behind a command. Receives the command's arguments.
pub type CommandCallback = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Data-only view of a registered command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandInfo {
    pub name: String,
    pub options: Attributes,
    pub usage_count: u64,
}

struct Entry {
    callback: CommandCallback,
    options: Attributes,
    usage_count: u64,
}

/// Commands by name, mirrored as `g:command_<name>`.
pub struct CommandRegistry {
    registry: Arc<dyn ObjectStore>,
    table: RwLock<BTreeMap<String, Entry>>,
}

impl CommandRegistry {
    pub fn new(registry: Arc<dyn ObjectStore>) -> Self {
        Self {
            registry,
            table: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn registry_key(name: &str) -> String {
        Scope::Global.qualify(&format!("command_{name}"))
    }

    /// Register `callback` as command `name`.
    ///
    /// An existing command of the same name is replaced and its usage count
    /// starts over at zero.
    pub fn register(
        &self,
        name: &str,
        callback: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
        options: Option<Attributes>,
    ) -> RegistryResult<()> {
        validate_callable_name(name)?;
        let options = options.unwrap_or_default();
        let object = Object::new(
            Self::registry_key(name),
            Value::from(name),
            Scope::Global,
            attributes([
                ("options", Value::Mapping(options.clone())),
                ("usage_count", Value::Number(0)),
            ]),
        )
        .with_source(SOURCE);

        let mut table = write(&self.table)?;
        self.registry.insert(object)?;
        table.insert(
            name.to_string(),
            Entry {
                callback: Arc::new(callback),
                options,
                usage_count: 0,
            },
        );
        debug!(command = %name, "command registered");
        Ok(())
    }

    /// Run a command: bump its usage count, then invoke it with `args`.
    pub fn execute(&self, name: &str, args: &[Value]) -> RegistryResult<Value> {
        let callback = {
            let mut table = write(&self.table)?;
            let entry = table
                .get_mut(name)
                .ok_or_else(|| RegistryError::UnknownCommand(name.to_string()))?;
            entry.usage_count += 1;
            let count = i64::try_from(entry.usage_count).unwrap_or(i64::MAX);
            let key = Self::registry_key(name);
            let own = self
                .registry
                .get(&key)?
                .is_some_and(|obj| obj.source() == Some(SOURCE));
            if own {
                self.registry.update(
                    &key,
                    Value::from(name),
                    Some(attributes([("usage_count", count)])),
                )?;
            } else {
                self.registry.insert(to_object(name, entry))?;
            }
            debug!(command = %name, usage = entry.usage_count, "command executed");
            entry.callback.clone()
        };
        Ok(callback(args))
    }

    /// How often a command ran since it was (re-)registered.
    pub fn usage_count(&self, name: &str) -> RegistryResult<Option<u64>> {
        Ok(read(&self.table)?.get(name).map(|e| e.usage_count))
    }

    pub fn info(&self, name: &str) -> RegistryResult<Option<CommandInfo>> {
        Ok(read(&self.table)?.get(name).map(|e| CommandInfo {
            name: name.to_string(),
            options: e.options.clone(),
            usage_count: e.usage_count,
        }))
    }

    pub fn contains(&self, name: &str) -> RegistryResult<bool> {
        Ok(read(&self.table)?.contains_key(name))
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

fn to_object(name: &str, entry: &Entry) -> Object {
    let count = i64::try_from(entry.usage_count).unwrap_or(i64::MAX);
    Object::new(
        CommandRegistry::registry_key(name),
        Value::from(name),
        Scope::Global,
        attributes([
            ("options", Value::Mapping(entry.options.clone())),
            ("usage_count", Value::Number(count)),
        ]),
    )
    .with_source(SOURCE)
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .table
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("CommandRegistry").field("commands", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vom_store::InMemoryObjectStore;

    fn setup() -> (Arc<InMemoryObjectStore>, Arc<CommandRegistry>) {
        let registry = Arc::new(InMemoryObjectStore::new());
        (registry.clone(), Arc::new(CommandRegistry::new(registry)))
    }

    fn echo(args: &[Value]) -> Value {
        Value::List(args.to_vec())
    }

    #[test]
    fn three_executions_count_three() {
        let (registry, commands) = setup();
        commands.register("greet", echo, None).unwrap();
        for _ in 0..3 {
            commands.execute("greet", &[]).unwrap();
        }
        assert_eq!(commands.usage_count("greet").unwrap(), Some(3));

        let obj = registry.get("g:command_greet").unwrap().unwrap();
        assert_eq!(obj.attributes["usage_count"], Value::Number(3));
    }

    #[test]
    fn execute_restores_an_overwritten_mirror() {
        let (registry, commands) = setup();
        commands.register("greet", echo, None).unwrap();
        registry
            .insert(Object::new("g:command_greet", Value::from(0), Scope::Global, Attributes::new()))
            .unwrap();
        commands.execute("greet", &[]).unwrap();

        let obj = registry.get("g:command_greet").unwrap().unwrap();
        assert_eq!(obj.source(), Some("command"));
        assert_eq!(obj.value, Value::from("greet"));
        assert_eq!(obj.attributes["usage_count"], Value::Number(1));
    }

    #[test]
    fn execute_passes_arguments() {
        let (_, commands) = setup();
        commands.register("greet", echo, None).unwrap();
        let out = commands.execute("greet", &[Value::from("a"), Value::from(2)]).unwrap();
        assert_eq!(out, Value::List(vec![Value::from("a"), Value::Number(2)]));
    }

    #[test]
    fn unknown_command() {
        let (_, commands) = setup();
        let err = commands.execute("missing", &[]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownCommand(ref n) if n == "missing"));
        assert_eq!(commands.usage_count("missing").unwrap(), None);
    }

    #[test]
    fn reregister_resets_usage() {
        let (_, commands) = setup();
        commands.register("greet", echo, None).unwrap();
        commands.execute("greet", &[]).unwrap();
        commands
            .register("greet", echo, Some(attributes([("nargs", "*")])))
            .unwrap();
        let info = commands.info("greet").unwrap().unwrap();
        assert_eq!(info.usage_count, 0);
        assert_eq!(info.options["nargs"], Value::from("*"));
    }

    #[test]
    fn callback_can_execute_other_commands() {
        let (_, commands) = setup();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        commands
            .register(
                "inner",
                move |_: &[Value]| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Value::Null
                },
                None,
            )
            .unwrap();
        let outer = commands.clone();
        commands
            .register(
                "outer",
                move |args: &[Value]| outer.execute("inner", args).unwrap_or_default(),
                None,
            )
            .unwrap();

        commands.execute("outer", &[]).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(commands.usage_count("inner").unwrap(), Some(1));
    }

    #[test]
    fn clear_removes_mirrors() {
        let (registry, commands) = setup();
        commands.register("a", echo, None).unwrap();
        commands.register("b", echo, None).unwrap();
        assert_eq!(commands.names().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert!(commands.unregister("a").unwrap());
        commands.clear().unwrap();
        assert!(registry.is_empty().unwrap());
    }
}
