//! The window store: per-window view state over a buffer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vom_store::ObjectStore;
use vom_types::{attributes, Attributes, BufferId, Object, Scope, TabId, Value, WindowId};

use crate::buffer::{self, Buffer};
use crate::error::{LayoutError, LayoutResult};
use crate::mirror;
use crate::table::Table;
use crate::tab;

pub(crate) const SOURCE: &str = "window";

/// Default size of a new window, in columns and rows.
pub const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// The option set every new window starts with.
pub fn default_window_options() -> Attributes {
    attributes([
        ("number", Value::from(true)),
        ("relativenumber", Value::from(false)),
        ("wrap", Value::from(true)),
        ("list", Value::from(false)),
        ("foldenable", Value::from(true)),
        ("foldmethod", Value::from("manual")),
        ("scrolloff", Value::from(0)),
        ("cursorline", Value::from(false)),
        ("cursorcolumn", Value::from(false)),
    ])
}

/// View state of one window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub id: WindowId,
    pub buffer: BufferId,
    /// Top-left corner as (x, y).
    pub position: (u16, u16),
    /// Size as (columns, rows).
    pub size: (u16, u16),
    /// Cursor as (line, column), both 1-based.
    pub cursor: (u32, u32),
    pub options: Attributes,
}

impl Window {
    pub fn registry_key(id: WindowId) -> String {
        Scope::Window.qualify(&id.object_name())
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    fn state_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("buffer".to_string(), Value::from(self.buffer.get()));
        map.insert(
            "position".to_string(),
            Value::from(vec![self.position.0, self.position.1]),
        );
        map.insert("size".to_string(), Value::from(vec![self.size.0, self.size.1]));
        map.insert(
            "cursor".to_string(),
            Value::from(vec![self.cursor.0, self.cursor.1]),
        );
        map.insert("options".to_string(), Value::Mapping(self.options.clone()));
        Value::Mapping(map)
    }

    fn to_object(&self) -> Object {
        Object::new(
            Self::registry_key(self.id),
            self.state_value(),
            Scope::Window,
            attributes([
                ("number", self.id.get()),
                ("buffer", self.buffer.get()),
            ]),
        )
        .with_source(SOURCE)
    }
}

/// Owns every window of a session.
pub struct WindowStore {
    registry: Arc<dyn ObjectStore>,
    table: Table<Window>,
    default_size: (u16, u16),
    default_options: Attributes,
}

impl WindowStore {
    pub fn new(registry: Arc<dyn ObjectStore>) -> Self {
        Self {
            registry,
            table: Table::new(),
            default_size: DEFAULT_SIZE,
            default_options: default_window_options(),
        }
    }

    /// Use `size` for windows created without an explicit size.
    pub fn with_default_size(mut self, size: (u16, u16)) -> Self {
        self.default_size = size;
        self
    }

    /// Layer `overrides` on top of the built-in option set for new windows.
    pub fn with_option_overrides(mut self, overrides: Attributes) -> Self {
        self.default_options.extend(overrides);
        self
    }

    /// Create a window over `buffer` at (0, 0) with the default size.
    pub fn create(&self, buffer: BufferId) -> LayoutResult<WindowId> {
        self.create_with(buffer, (0, 0), self.default_size)
    }

    /// Create a window over `buffer` with an explicit position and size.
    ///
    /// Fails with [`LayoutError::UnknownBuffer`] if `buffer` is not in the
    /// registry.
    pub fn create_with(
        &self,
        buffer: BufferId,
        position: (u16, u16),
        size: (u16, u16),
    ) -> LayoutResult<WindowId> {
        self.check_buffer(buffer)?;
        let mut table = self.table.write()?;
        let id = WindowId::new(table.allocate()?);
        let window = Window {
            id,
            buffer,
            position,
            size,
            cursor: (1, 1),
            options: self.default_options.clone(),
        };
        self.registry.insert(window.to_object())?;
        debug!(window = %id, buffer = %buffer, "window created");
        table.rows.insert(id.get(), window);
        Ok(id)
    }

    pub fn get(&self, id: WindowId) -> LayoutResult<Option<Window>> {
        Ok(self.table.read()?.rows.get(&id.get()).cloned())
    }

    pub fn buffer_of(&self, id: WindowId) -> LayoutResult<Option<BufferId>> {
        Ok(self.get(id)?.map(|w| w.buffer))
    }

    pub fn option(&self, id: WindowId, key: &str) -> LayoutResult<Option<Value>> {
        Ok(self.get(id)?.and_then(|w| w.options.get(key).cloned()))
    }

    /// Set a window option. Any key is accepted.
    ///
    /// Returns `Ok(false)` if the window does not exist.
    pub fn set_option(&self, id: WindowId, key: &str, value: Value) -> LayoutResult<bool> {
        self.modify(id, |window| {
            window.options.insert(key.to_string(), value);
        })
    }

    /// Move the cursor. Returns `Ok(false)` if the window does not exist.
    pub fn set_cursor(&self, id: WindowId, cursor: (u32, u32)) -> LayoutResult<bool> {
        self.modify(id, |window| window.cursor = cursor)
    }

    /// Point a window at another buffer.
    ///
    /// Returns `Ok(false)` if the window does not exist, and fails with
    /// [`LayoutError::UnknownBuffer`] if the buffer does not.
    pub fn set_buffer(&self, id: WindowId, buffer: BufferId) -> LayoutResult<bool> {
        self.check_buffer(buffer)?;
        self.modify(id, |window| {
            window.buffer = buffer;
            window.cursor = (1, 1);
        })
    }

    /// Delete a window and its mirror. Returns `true` if it existed.
    ///
    /// Fails with [`LayoutError::WindowInUse`] while a tab still lists the
    /// window; nothing is deleted in that case.
    pub fn delete(&self, id: WindowId) -> LayoutResult<bool> {
        let mut table = self.table.write()?;
        if !table.rows.contains_key(&id.get()) {
            return Ok(false);
        }
        if let Some(tab) = self.listed_in(id)? {
            warn!(window = %id, tab = %tab, "refused to delete a window in use");
            return Err(LayoutError::WindowInUse { window: id, tab });
        }
        table.rows.remove(&id.get());
        self.registry.delete(&Window::registry_key(id))?;
        debug!(window = %id, "window deleted");
        Ok(true)
    }

    pub fn ids(&self) -> LayoutResult<Vec<WindowId>> {
        Ok(self.table.read()?.rows.keys().map(|&k| WindowId::new(k)).collect())
    }

    pub fn all(&self) -> LayoutResult<Vec<Window>> {
        Ok(self.table.read()?.rows.values().cloned().collect())
    }

    pub fn len(&self) -> LayoutResult<usize> {
        Ok(self.table.read()?.rows.len())
    }

    pub fn is_empty(&self) -> LayoutResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Put back a window exactly as it was.
    ///
    /// The buffer reference is checked like on creation, so buffers must be
    /// restored first.
    pub fn restore(&self, window: Window) -> LayoutResult<()> {
        self.check_buffer(window.buffer)?;
        let mut table = self.table.write()?;
        table.reserve(window.id.get())?;
        self.registry.insert(window.to_object())?;
        table.rows.insert(window.id.get(), window);
        Ok(())
    }

    pub fn clear(&self) -> LayoutResult<()> {
        let mut table = self.table.write()?;
        for id in table.rows.keys() {
            self.registry.delete(&Window::registry_key(WindowId::new(*id)))?;
        }
        table.reset();
        Ok(())
    }

    fn check_buffer(&self, buffer: BufferId) -> LayoutResult<()> {
        if mirror::is_mirrored(self.registry.as_ref(), &Buffer::registry_key(buffer), buffer::SOURCE)? {
            Ok(())
        } else {
            warn!(buffer = %buffer, "rejected window over unknown buffer");
            Err(LayoutError::UnknownBuffer(buffer))
        }
    }

    fn modify(&self, id: WindowId, change: impl FnOnce(&mut Window)) -> LayoutResult<bool> {
        let mut table = self.table.write()?;
        let Some(window) = table.rows.get_mut(&id.get()) else {
            return Ok(false);
        };
        change(window);
        mirror::refresh(
            self.registry.as_ref(),
            SOURCE,
            window.to_object(),
            attributes([("buffer", window.buffer.get())]),
        )?;
        Ok(true)
    }

    /// The first tab whose mirror lists `id`.
    fn listed_in(&self, id: WindowId) -> LayoutResult<Option<TabId>> {
        let wanted = Value::from(id.get());
        let prefix = Scope::Tab.qualify("tab_");
        let listed = mirror::mirrors(self.registry.as_ref(), &prefix, tab::SOURCE)?
            .into_iter()
            .filter(|obj| obj.value.as_list().is_some_and(|ids| ids.contains(&wanted)))
            .find_map(|obj| obj.attribute("number").and_then(Value::as_number))
            .and_then(|n| u32::try_from(n).ok())
            .map(TabId::new);
        Ok(listed)
    }
}

impl std::fmt::Debug for WindowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowStore")
            .field("table", &self.table)
            .field("default_size", &self.default_size)
            .finish()
    }
}
