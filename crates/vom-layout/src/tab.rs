//! The tab store: ordered window lists keyed by [`TabId`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vom_store::ObjectStore;
use vom_types::{attributes, Object, Scope, TabId, Value, WindowId};

use crate::error::{LayoutError, LayoutResult};
use crate::mirror;
use crate::table::Table;
use crate::window::{self, Window};

pub(crate) const SOURCE: &str = "tab";

/// A tab page: an ordered list of windows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub windows: Vec<WindowId>,
}

impl Tab {
    pub fn registry_key(id: TabId) -> String {
        Scope::Tab.qualify(&id.object_name())
    }

    fn windows_value(&self) -> Value {
        Value::from(self.windows.iter().map(|w| w.get()).collect::<Vec<_>>())
    }

    fn to_object(&self) -> Object {
        Object::new(
            Self::registry_key(self.id),
            self.windows_value(),
            Scope::Tab,
            attributes([
                ("number", Value::from(self.id.get())),
                ("windows", self.windows_value()),
            ]),
        )
        .with_source(SOURCE)
    }
}

/// Owns every tab page of a session.
pub struct TabStore {
    registry: Arc<dyn ObjectStore>,
    table: Table<Tab>,
}

impl TabStore {
    pub fn new(registry: Arc<dyn ObjectStore>) -> Self {
        Self {
            registry,
            table: Table::new(),
        }
    }

    /// Create a tab holding `windows`, in order.
    ///
    /// Fails with [`LayoutError::UnknownWindow`] if any window does not
    /// exist; nothing is created in that case.
    pub fn create(&self, windows: Vec<WindowId>) -> LayoutResult<TabId> {
        for window in &windows {
            self.check_window(*window)?;
        }
        let mut table = self.table.write()?;
        let id = TabId::new(table.allocate()?);
        let tab = Tab { id, windows };
        self.registry.insert(tab.to_object())?;
        debug!(tab = %id, windows = tab.windows.len(), "tab created");
        table.rows.insert(id.get(), tab);
        Ok(id)
    }

    pub fn get(&self, id: TabId) -> LayoutResult<Option<Tab>> {
        Ok(self.table.read()?.rows.get(&id.get()).cloned())
    }

    pub fn windows(&self, id: TabId) -> LayoutResult<Option<Vec<WindowId>>> {
        Ok(self.get(id)?.map(|t| t.windows))
    }

    /// Append a window to a tab.
    ///
    /// Returns `Ok(false)` if the tab does not exist. Fails with
    /// [`LayoutError::UnknownWindow`] if the tab exists but the window does
    /// not.
    pub fn add_window(&self, id: TabId, window: WindowId) -> LayoutResult<bool> {
        if self.get(id)?.is_none() {
            return Ok(false);
        }
        self.check_window(window)?;
        self.modify(id, |tab| tab.windows.push(window))
    }

    /// Remove every occurrence of `window` from a tab.
    ///
    /// Returns `Ok(false)` if the tab does not exist or did not hold it.
    pub fn remove_window(&self, id: TabId, window: WindowId) -> LayoutResult<bool> {
        let mut removed = false;
        let found = self.modify(id, |tab| {
            let before = tab.windows.len();
            tab.windows.retain(|w| *w != window);
            removed = tab.windows.len() != before;
        })?;
        Ok(found && removed)
    }

    /// The tab holding `window`, if any.
    pub fn tab_of(&self, window: WindowId) -> LayoutResult<Option<TabId>> {
        let table = self.table.read()?;
        Ok(table
            .rows
            .values()
            .find(|tab| tab.windows.contains(&window))
            .map(|tab| tab.id))
    }

    pub fn delete(&self, id: TabId) -> LayoutResult<bool> {
        let mut table = self.table.write()?;
        if table.rows.remove(&id.get()).is_none() {
            return Ok(false);
        }
        self.registry.delete(&Tab::registry_key(id))?;
        debug!(tab = %id, "tab deleted");
        Ok(true)
    }

    pub fn ids(&self) -> LayoutResult<Vec<TabId>> {
        Ok(self.table.read()?.rows.keys().map(|&k| TabId::new(k)).collect())
    }

    pub fn all(&self) -> LayoutResult<Vec<Tab>> {
        Ok(self.table.read()?.rows.values().cloned().collect())
    }

    pub fn len(&self) -> LayoutResult<usize> {
        Ok(self.table.read()?.rows.len())
    }

    pub fn is_empty(&self) -> LayoutResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Put back a tab exactly as it was. Windows must be restored first.
    pub fn restore(&self, tab: Tab) -> LayoutResult<()> {
        for window in &tab.windows {
            self.check_window(*window)?;
        }
        let mut table = self.table.write()?;
        table.reserve(tab.id.get())?;
        self.registry.insert(tab.to_object())?;
        table.rows.insert(tab.id.get(), tab);
        Ok(())
    }

    pub fn clear(&self) -> LayoutResult<()> {
        let mut table = self.table.write()?;
        for id in table.rows.keys() {
            self.registry.delete(&Tab::registry_key(TabId::new(*id)))?;
        }
        table.reset();
        Ok(())
    }

    fn check_window(&self, window: WindowId) -> LayoutResult<()> {
        if mirror::is_mirrored(self.registry.as_ref(), &Window::registry_key(window), window::SOURCE)? {
            Ok(())
        } else {
            warn!(window = %window, "rejected reference to unknown window");
            Err(LayoutError::UnknownWindow(window))
        }
    }

    fn modify(&self, id: TabId, change: impl FnOnce(&mut Tab)) -> LayoutResult<bool> {
        let mut table = self.table.write()?;
        let Some(tab) = table.rows.get_mut(&id.get()) else {
            return Ok(false);
        };
        change(tab);
        mirror::refresh(
            self.registry.as_ref(),
            SOURCE,
            tab.to_object(),
            attributes([("windows", tab.windows_value())]),
        )?;
        Ok(true)
    }
}

impl std::fmt::Debug for TabStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabStore").field("table", &self.table).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferStore;
    use crate::window::WindowStore;
    use vom_store::InMemoryObjectStore;

    struct Fixture {
        registry: Arc<InMemoryObjectStore>,
        windows: WindowStore,
        tabs: TabStore,
        buffer: vom_types::BufferId,
    }

    fn setup() -> Fixture {
        let registry = Arc::new(InMemoryObjectStore::new());
        let buffers = BufferStore::new(registry.clone());
        let buffer = buffers.create(vec![]).unwrap();
        Fixture {
            windows: WindowStore::new(registry.clone()),
            tabs: TabStore::new(registry.clone()),
            registry,
            buffer,
        }
    }

    #[test]
    fn create_empty_and_populated() {
        let fx = setup();
        let w = fx.windows.create(fx.buffer).unwrap();

        let empty = fx.tabs.create(vec![]).unwrap();
        let full = fx.tabs.create(vec![w]).unwrap();
        assert_eq!(empty, TabId::new(1));
        assert_eq!(full, TabId::new(2));
        assert_eq!(fx.tabs.windows(empty).unwrap(), Some(vec![]));
        assert_eq!(fx.tabs.windows(full).unwrap(), Some(vec![w]));

        let obj = fx.registry.get("t:tab_2").unwrap().expect("mirrored");
        assert_eq!(obj.value, Value::from(vec![1u32]));
    }

    #[test]
    fn create_rejects_unknown_window() {
        let fx = setup();
        let err = fx.tabs.create(vec![WindowId::new(5)]).unwrap_err();
        assert!(matches!(err, LayoutError::UnknownWindow(_)));
        assert!(fx.tabs.is_empty().unwrap());
    }

    #[test]
    fn add_window_appends_in_order() {
        let fx = setup();
        let a = fx.windows.create(fx.buffer).unwrap();
        let b = fx.windows.create(fx.buffer).unwrap();
        let tab = fx.tabs.create(vec![a]).unwrap();

        assert!(fx.tabs.add_window(tab, b).unwrap());
        assert_eq!(fx.tabs.windows(tab).unwrap(), Some(vec![a, b]));

        let obj = fx.registry.get("t:tab_1").unwrap().unwrap();
        assert_eq!(obj.value, Value::from(vec![1u32, 2]));
        assert_eq!(obj.attributes["windows"], Value::from(vec![1u32, 2]));
    }

    #[test]
    fn add_window_to_unknown_tab() {
        let fx = setup();
        let a = fx.windows.create(fx.buffer).unwrap();
        assert!(!fx.tabs.add_window(TabId::new(3), a).unwrap());
        // The tab check comes first, so a bad window on a bad tab is soft too.
        assert!(!fx.tabs.add_window(TabId::new(3), WindowId::new(99)).unwrap());
    }

    #[test]
    fn add_unknown_window_fails() {
        let fx = setup();
        let tab = fx.tabs.create(vec![]).unwrap();
        assert!(fx.tabs.add_window(tab, WindowId::new(99)).is_err());
        assert_eq!(fx.tabs.windows(tab).unwrap(), Some(vec![]));
    }

    #[test]
    fn remove_window_and_lookup() {
        let fx = setup();
        let a = fx.windows.create(fx.buffer).unwrap();
        let b = fx.windows.create(fx.buffer).unwrap();
        let tab = fx.tabs.create(vec![a, b]).unwrap();

        assert_eq!(fx.tabs.tab_of(b).unwrap(), Some(tab));
        assert!(fx.tabs.remove_window(tab, a).unwrap());
        assert!(!fx.tabs.remove_window(tab, a).unwrap());
        assert_eq!(fx.tabs.windows(tab).unwrap(), Some(vec![b]));
        assert_eq!(fx.tabs.tab_of(a).unwrap(), None);
    }

    #[test]
    fn listed_window_cannot_be_deleted() {
        let fx = setup();
        let w = fx.windows.create(fx.buffer).unwrap();
        let tab = fx.tabs.create(vec![w]).unwrap();

        let err = fx.windows.delete(w).unwrap_err();
        assert!(matches!(err, LayoutError::WindowInUse { window, tab: t } if window == w && t == tab));
        assert!(fx.registry.contains("w:window_1").unwrap());

        fx.tabs.remove_window(tab, w).unwrap();
        assert!(fx.windows.delete(w).unwrap());
    }

    #[test]
    fn window_key_held_by_another_source_is_not_a_window() {
        let fx = setup();
        fx.registry
            .insert(
                Object::new("w:window_4", Value::from(4), Scope::Window, Default::default())
                    .with_source("variable"),
            )
            .unwrap();
        assert!(matches!(
            fx.tabs.create(vec![WindowId::new(4)]).unwrap_err(),
            LayoutError::UnknownWindow(_)
        ));
    }

    #[test]
    fn clear_forgets_tabs() {
        let fx = setup();
        let tab = fx.tabs.create(vec![]).unwrap();
        fx.tabs.clear().unwrap();
        assert!(fx.tabs.get(tab).unwrap().is_none());
        assert!(!fx.registry.contains("t:tab_1").unwrap());
    }
}
