use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{RegistryError, RegistryResult};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RegistryResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| RegistryError::Poisoned(e.to_string()))
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RegistryResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| RegistryError::Poisoned(e.to_string()))
}
