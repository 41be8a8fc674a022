//! Process-wide facade registry
//!
//! Maps each live owner id to an introspection entry (mount path and
//! registered command names) so tooling can enumerate the facades of a
//! process. Registration happens at facade construction and is the point
//! where duplicate owner ids are rejected; deregistration happens at
//! destroy. [`reset`] is the test hook; tests touching the registry must be
//! serialized (`serial_test`).

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use strata_core::{OwnerId, SlicePath, StrataError};

/// Introspection record for one live facade.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    /// The facade's owner id.
    pub owner: OwnerId,
    /// The mount-point path the facade commits to.
    pub path: SlicePath,
    /// Registered command names, in registration order.
    pub commands: Vec<String>,
}

static REGISTRY: Lazy<RwLock<BTreeMap<OwnerId, RegistryEntry>>> =
    Lazy::new(|| RwLock::new(BTreeMap::new()));

/// Register a facade. Errors if the owner id is already live.
pub(crate) fn register(entry: RegistryEntry) -> Result<(), StrataError> {
    let mut registry = REGISTRY.write();
    if registry.contains_key(&entry.owner) {
        return Err(StrataError::duplicate_owner(entry.owner.as_str()));
    }
    debug!(owner = %entry.owner, path = %entry.path, "facade registered");
    registry.insert(entry.owner.clone(), entry);
    Ok(())
}

/// Remove a facade's entry. Removing an absent owner is a no-op.
pub(crate) fn deregister(owner: &OwnerId) {
    if REGISTRY.write().remove(owner).is_some() {
        debug!(owner = %owner, "facade deregistered");
    }
}

/// Look up one owner's entry.
#[must_use]
pub fn lookup(owner: &OwnerId) -> Option<RegistryEntry> {
    REGISTRY.read().get(owner).cloned()
}

/// Snapshot of every live facade, ordered by owner id.
#[must_use]
pub fn snapshot() -> Vec<RegistryEntry> {
    REGISTRY.read().values().cloned().collect()
}

/// Clear the registry.
///
/// Test hook: pair with `serial_test` when tests touch this global.
pub fn reset() {
    REGISTRY.write().clear();
}
