//! Observer hooks for presentation code.
//!
//! After every merge the service hands each [`StateObserver`] the current
//! snapshot.  Observers keep their own record of what they have materialized,
//! so repeated calls with the same snapshot must not spawn anything twice.

use crate::table::TableSnapshot;
use crate::types::EntityIdentity;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

pub trait StateObserver: Send {
    /// Called once per cycle with the post-merge snapshot.
    fn materialize(&mut self, snapshot: &TableSnapshot, local: Option<&EntityIdentity>);

    /// Called when an identity is evicted through the explicit removal hook.
    fn evict(&mut self, identity: &EntityIdentity);
}

impl<O: StateObserver + ?Sized> StateObserver for Arc<Mutex<O>> {
    fn materialize(&mut self, snapshot: &TableSnapshot, local: Option<&EntityIdentity>) {
        self.lock().materialize(snapshot, local);
    }

    fn evict(&mut self, identity: &EntityIdentity) {
        self.lock().evict(identity);
    }
}

// ---------------------------------------------------------------------------
// Remote actor tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    Spawned(EntityIdentity),
    Despawned(EntityIdentity),
}

/// Tracks which remote actors have a presentation object.
///
/// The local actor is never materialized here; its presentation is owned by
/// the input side.  Changes queue up until [`drain_changes`] is called.
///
/// [`drain_changes`]: RemoteActorTracker::drain_changes
#[derive(Debug, Default)]
pub struct RemoteActorTracker {
    materialized: HashSet<EntityIdentity>,
    changes: Vec<PresenceChange>,
}

impl RemoteActorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_materialized(&self, identity: &EntityIdentity) -> bool {
        self.materialized.contains(identity)
    }

    pub fn materialized_count(&self) -> usize {
        self.materialized.len()
    }

    pub fn drain_changes(&mut self) -> Vec<PresenceChange> {
        std::mem::take(&mut self.changes)
    }
}

impl StateObserver for RemoteActorTracker {
    fn materialize(&mut self, snapshot: &TableSnapshot, local: Option<&EntityIdentity>) {
        let vanished: Vec<EntityIdentity> = self
            .materialized
            .iter()
            .filter(|id| !snapshot.contains(id) || Some(*id) == local)
            .cloned()
            .collect();
        for id in vanished {
            debug!("Remote actor {} left the table", id);
            self.materialized.remove(&id);
            self.changes.push(PresenceChange::Despawned(id));
        }

        for id in snapshot.identities() {
            if Some(id) == local || self.materialized.contains(id) {
                continue;
            }
            debug!("Materializing remote actor {}", id);
            self.materialized.insert(id.clone());
            self.changes.push(PresenceChange::Spawned(id.clone()));
        }
    }

    fn evict(&mut self, identity: &EntityIdentity) {
        self.materialized.remove(identity);
    }
}
