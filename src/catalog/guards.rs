//! Guard predicates: does the catalog still need a synchronization pass?

use crate::catalog::types::CatalogSnapshot;

/// Checked once after the catalog is restored from disk.
///
/// Anything not yet loaded needs work, including entries whose fetch was
/// abandoned by the previous process.
pub fn needs_loading_after_restore(snapshot: &CatalogSnapshot) -> bool {
    if snapshot.is_empty() {
        return true;
    }

    snapshot
        .hosts
        .values()
        .any(|host| !host.loaded || host.models().any(|model| !model.loaded))
}

/// Checked after every live mutation.
///
/// Entries that are already fetching do not count, so the synchronizer's own
/// progress updates do not re-trigger it.
pub fn needs_loading_after_change(snapshot: &CatalogSnapshot) -> bool {
    if snapshot.is_empty() {
        return true;
    }

    snapshot.hosts.values().any(|host| {
        host.state().is_queued() || host.models().any(|model| model.state().is_queued())
    })
}
