use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{LayoutError, LayoutResult};

/// Rows keyed by raw id, plus the next id to hand out.
#[derive(Debug)]
pub(crate) struct Rows<T> {
    pub(crate) rows: BTreeMap<u32, T>,
    next: u32,
}

impl<T> Rows<T> {
    /// Reserve the next sequential id.
    pub(crate) fn allocate(&mut self) -> LayoutResult<u32> {
        if self.next == u32::MAX {
            return Err(LayoutError::IdsExhausted);
        }
        let id = self.next;
        self.next += 1;
        Ok(id)
    }

    /// Make sure `id` will never be handed out again.
    ///
    /// Fails with [`LayoutError::InvalidId`] for 0 and `u32::MAX`.
    pub(crate) fn reserve(&mut self, id: u32) -> LayoutResult<()> {
        check_id(id)?;
        self.next = self.next.max(id + 1);
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.rows.clear();
        self.next = 1;
    }
}

/// Reject ids a store would never hand out.
pub fn check_id(id: u32) -> LayoutResult<()> {
    if id == 0 || id == u32::MAX {
        Err(LayoutError::InvalidId(id))
    } else {
        Ok(())
    }
}

/// Lock-guarded table shared by the layout stores.
#[derive(Debug)]
pub(crate) struct Table<T> {
    inner: RwLock<Rows<T>>,
}

impl<T> Table<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(Rows {
                rows: BTreeMap::new(),
                next: 1,
            }),
        }
    }

    pub(crate) fn read(&self) -> LayoutResult<RwLockReadGuard<'_, Rows<T>>> {
        self.inner
            .read()
            .map_err(|e| LayoutError::Poisoned(e.to_string()))
    }

    pub(crate) fn write(&self) -> LayoutResult<RwLockWriteGuard<'_, Rows<T>>> {
        self.inner
            .write()
            .map_err(|e| LayoutError::Poisoned(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_never_reused() {
        let table: Table<()> = Table::new();
        let mut rows = table.write().unwrap();
        assert_eq!(rows.allocate().unwrap(), 1);
        assert_eq!(rows.allocate().unwrap(), 2);
        rows.reserve(7).unwrap();
        assert_eq!(rows.allocate().unwrap(), 8);
        rows.reserve(3).unwrap();
        assert_eq!(rows.allocate().unwrap(), 9);
    }

    #[test]
    fn reset_restarts_at_one() {
        let table: Table<u8> = Table::new();
        let mut rows = table.write().unwrap();
        let id = rows.allocate().unwrap();
        rows.rows.insert(id, 0);
        rows.reset();
        assert!(rows.rows.is_empty());
        assert_eq!(rows.allocate().unwrap(), 1);
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        let table: Table<()> = Table::new();
        let mut rows = table.write().unwrap();
        assert!(matches!(rows.reserve(0), Err(LayoutError::InvalidId(0))));
        assert!(matches!(rows.reserve(u32::MAX), Err(LayoutError::InvalidId(u32::MAX))));
        assert_eq!(rows.allocate().unwrap(), 1);
    }

    #[test]
    fn allocation_stops_before_the_last_id() {
        let table: Table<()> = Table::new();
        let mut rows = table.write().unwrap();
        rows.reserve(u32::MAX - 2).unwrap();
        assert_eq!(rows.allocate().unwrap(), u32::MAX - 1);
        assert!(matches!(rows.allocate(), Err(LayoutError::IdsExhausted)));
    }
}
