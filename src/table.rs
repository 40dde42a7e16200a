//! `StateTable` – authoritative per-entity state mirrored from the ledger.
//!
//! The table has a single writer (the reconciliation engine).  Observers on
//! other threads go through [`SharedStateTable`] and only ever see
//! point-in-time [`TableSnapshot`]s.

use crate::types::{EntityIdentity, EntityState};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::hash_map::{self, HashMap};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StateTable {
    entries: HashMap<EntityIdentity, EntityState>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &EntityIdentity) -> Option<&EntityState> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &EntityIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy the current mapping into a read-only snapshot.
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            entries: self.entries.clone(),
        }
    }

    /// Explicit removal hook.  Removing an absent key is a no-op.
    pub fn remove_entry(&mut self, identity: &EntityIdentity) -> Option<EntityState> {
        self.entries.remove(identity)
    }

    pub(crate) fn entry(
        &mut self,
        identity: EntityIdentity,
    ) -> hash_map::Entry<'_, EntityIdentity, EntityState> {
        self.entries.entry(identity)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read-only copy of the table taken at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSnapshot {
    entries: HashMap<EntityIdentity, EntityState>,
}

impl TableSnapshot {
    pub fn get(&self, identity: &EntityIdentity) -> Option<&EntityState> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &EntityIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityIdentity, &EntityState)> {
        self.entries.iter()
    }

    pub fn identities(&self) -> impl Iterator<Item = &EntityIdentity> {
        self.entries.keys()
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Cloneable handle to the one `StateTable` of a sync service.
///
/// Readers take snapshots; writes stay inside the crate.
#[derive(Debug, Clone, Default)]
pub struct SharedStateTable {
    inner: Arc<RwLock<StateTable>>,
}

impl SharedStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        self.inner.read().snapshot()
    }

    pub fn get(&self, identity: &EntityIdentity) -> Option<EntityState> {
        self.inner.read().get(identity).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, StateTable> {
        self.inner.write()
    }
}
