//! The buffer store: text content keyed by [`BufferId`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vom_store::ObjectStore;
use vom_types::{attributes, BufferId, Object, Scope, Value, WindowId};

use crate::error::{LayoutError, LayoutResult};
use crate::mirror;
use crate::table::Table;
use crate::window;

pub(crate) const SOURCE: &str = "buffer";

/// An in-memory text buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buffer {
    pub id: BufferId,
    pub lines: Vec<String>,
    /// Set on every content replacement; only [`BufferStore::mark_saved`]
    /// clears it.
    pub modified: bool,
    /// The file this buffer was read from or last written to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Buffer {
    /// The registry key this buffer is mirrored under.
    pub fn registry_key(id: BufferId) -> String {
        Scope::Buffer.qualify(&id.object_name())
    }

    fn to_object(&self) -> Object {
        Object::new(
            Self::registry_key(self.id),
            Value::lines(self.lines.iter().cloned()),
            Scope::Buffer,
            attributes([
                ("modified", Value::from(self.modified)),
                ("name", Value::from(self.id.object_name())),
                ("number", Value::from(self.id.get())),
                ("file", Value::from(self.name.clone())),
            ]),
        )
        .with_source(SOURCE)
    }
}

/// Owns every buffer of a session.
pub struct BufferStore {
    registry: Arc<dyn ObjectStore>,
    table: Table<Buffer>,
}

impl BufferStore {
    pub fn new(registry: Arc<dyn ObjectStore>) -> Self {
        Self {
            registry,
            table: Table::new(),
        }
    }

    /// Create a buffer holding `content` and return its id.
    ///
    /// The buffer starts unmodified.
    pub fn create(&self, content: Vec<String>) -> LayoutResult<BufferId> {
        let mut table = self.table.write()?;
        let id = BufferId::new(table.allocate()?);
        let buffer = Buffer {
            id,
            lines: content,
            modified: false,
            name: None,
        };
        self.registry.insert(buffer.to_object())?;
        debug!(buffer = %id, lines = buffer.lines.len(), "buffer created");
        table.rows.insert(id.get(), buffer);
        Ok(id)
    }

    pub fn get(&self, id: BufferId) -> LayoutResult<Option<Buffer>> {
        Ok(self.table.read()?.rows.get(&id.get()).cloned())
    }

    pub fn content(&self, id: BufferId) -> LayoutResult<Option<Vec<String>>> {
        Ok(self.get(id)?.map(|b| b.lines))
    }

    /// Replace the content of a buffer and mark it modified.
    ///
    /// Returns `Ok(false)` if the buffer does not exist.
    pub fn set_content(&self, id: BufferId, lines: Vec<String>) -> LayoutResult<bool> {
        let mut table = self.table.write()?;
        let Some(buffer) = table.rows.get_mut(&id.get()) else {
            return Ok(false);
        };
        buffer.lines = lines;
        buffer.modified = true;
        self.refresh(buffer)?;
        debug!(buffer = %id, lines = buffer.lines.len(), "buffer content replaced");
        Ok(true)
    }

    pub fn is_modified(&self, id: BufferId) -> LayoutResult<Option<bool>> {
        Ok(self.get(id)?.map(|b| b.modified))
    }

    /// The file name attached to a buffer, if any.
    pub fn name(&self, id: BufferId) -> LayoutResult<Option<String>> {
        Ok(self.get(id)?.and_then(|b| b.name))
    }

    /// Attach a file name to a buffer. Does not touch the modified flag.
    ///
    /// Returns `Ok(false)` if the buffer does not exist.
    pub fn set_name(&self, id: BufferId, name: impl Into<String>) -> LayoutResult<bool> {
        let mut table = self.table.write()?;
        let Some(buffer) = table.rows.get_mut(&id.get()) else {
            return Ok(false);
        };
        buffer.name = Some(name.into());
        self.refresh(buffer)?;
        debug!(buffer = %id, name = ?buffer.name, "buffer renamed");
        Ok(true)
    }

    /// Clear the modified flag, e.g. after the buffer was written out.
    ///
    /// Returns `Ok(false)` if the buffer does not exist.
    pub fn mark_saved(&self, id: BufferId) -> LayoutResult<bool> {
        let mut table = self.table.write()?;
        let Some(buffer) = table.rows.get_mut(&id.get()) else {
            return Ok(false);
        };
        buffer.modified = false;
        self.refresh(buffer)?;
        Ok(true)
    }

    /// Delete a buffer and its mirror. Returns `true` if it existed.
    ///
    /// Fails with [`LayoutError::BufferInUse`] while any window shows the
    /// buffer; nothing is deleted in that case.
    pub fn delete(&self, id: BufferId) -> LayoutResult<bool> {
        let mut table = self.table.write()?;
        if !table.rows.contains_key(&id.get()) {
            return Ok(false);
        }
        if let Some(window) = self.shown_in(id)? {
            warn!(buffer = %id, window = %window, "refused to delete a buffer in use");
            return Err(LayoutError::BufferInUse { buffer: id, window });
        }
        table.rows.remove(&id.get());
        self.registry.delete(&Buffer::registry_key(id))?;
        debug!(buffer = %id, "buffer deleted");
        Ok(true)
    }

    /// All buffer ids in ascending order.
    pub fn ids(&self) -> LayoutResult<Vec<BufferId>> {
        Ok(self.table.read()?.rows.keys().map(|&k| BufferId::new(k)).collect())
    }

    /// Snapshot of every buffer in ascending id order.
    pub fn all(&self) -> LayoutResult<Vec<Buffer>> {
        Ok(self.table.read()?.rows.values().cloned().collect())
    }

    pub fn len(&self) -> LayoutResult<usize> {
        Ok(self.table.read()?.rows.len())
    }

    pub fn is_empty(&self) -> LayoutResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Put back a buffer exactly as it was, keeping its id and modified flag.
    pub fn restore(&self, buffer: Buffer) -> LayoutResult<()> {
        let mut table = self.table.write()?;
        table.reserve(buffer.id.get())?;
        self.registry.insert(buffer.to_object())?;
        table.rows.insert(buffer.id.get(), buffer);
        Ok(())
    }

    /// Drop every buffer and its mirror, and restart ids at 1.
    pub fn clear(&self) -> LayoutResult<()> {
        let mut table = self.table.write()?;
        for id in table.rows.keys() {
            self.registry.delete(&Buffer::registry_key(BufferId::new(*id)))?;
        }
        table.reset();
        Ok(())
    }

    fn refresh(&self, buffer: &Buffer) -> LayoutResult<()> {
        mirror::refresh(
            self.registry.as_ref(),
            SOURCE,
            buffer.to_object(),
            attributes([
                ("modified", Value::from(buffer.modified)),
                ("file", Value::from(buffer.name.clone())),
            ]),
        )
    }

    /// The first window whose mirror points at `id`.
    fn shown_in(&self, id: BufferId) -> LayoutResult<Option<WindowId>> {
        let prefix = Scope::Window.qualify("window_");
        let shown = mirror::mirrors(self.registry.as_ref(), &prefix, window::SOURCE)?
            .into_iter()
            .filter(|obj| obj.attribute("buffer") == Some(&Value::from(id.get())))
            .find_map(|obj| obj.attribute("number").and_then(Value::as_number))
            .and_then(|n| u32::try_from(n).ok())
            .map(WindowId::new);
        Ok(shown)
    }
}

impl std::fmt::Debug for BufferStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferStore")
            .field("table", &self.table)
            .finish()
    }
}
