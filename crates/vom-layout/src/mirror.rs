//! Keeping a store's registry mirror in step with its table.
//!
//! Mirror keys (`b:buffer_N`, ...) live in the same registry as variables, so
//! an object at a mirror key only counts as the store's own when its
//! `source` metadata says so.

use vom_store::ObjectStore;
use vom_types::{Attributes, Object};

use crate::error::LayoutResult;

/// Whether `key` holds a mirror written by the store named `source`.
pub(crate) fn is_mirrored(registry: &dyn ObjectStore, key: &str, source: &str) -> LayoutResult<bool> {
    Ok(registry
        .get(key)?
        .is_some_and(|obj| obj.source() == Some(source)))
}

/// Update the mirror of `object` in place, merging `changed` into its
/// attributes. A missing mirror, or an object some other store wrote at the
/// same key, is replaced by `object` outright.
pub(crate) fn refresh(
    registry: &dyn ObjectStore,
    source: &str,
    object: Object,
    changed: Attributes,
) -> LayoutResult<()> {
    if is_mirrored(registry, &object.name, source)? {
        registry.update(&object.name, object.value, Some(changed))?;
    } else {
        registry.insert(object)?;
    }
    Ok(())
}

/// Objects mirrored by `source` under `prefix`.
pub(crate) fn mirrors(registry: &dyn ObjectStore, prefix: &str, source: &str) -> LayoutResult<Vec<Object>> {
    Ok(registry
        .list(prefix)?
        .into_iter()
        .filter(|obj| obj.source() == Some(source))
        .collect())
}
