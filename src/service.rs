//! SyncService – one poll → decode → merge → materialize cycle at a time.

use crate::feed::EventFeed;
use crate::identity::{IdentityProvider, IdentityResolver};
use crate::observer::StateObserver;
use crate::poller::{EventPoller, PollCursorState};
use crate::reconcile::{MergeSummary, ReconciliationEngine};
use crate::settings::SyncConfig;
use crate::table::{SharedStateTable, TableSnapshot};
use crate::types::{EntityIdentity, EntityState, SyncStats};
use log::{debug, info, warn};

// ---------------------------------------------------------------------------
// Cycle result
// ---------------------------------------------------------------------------

/// What a single [`SyncService::cycle`] call did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// The cycle counter that produced this report.
    pub cycle: u64,
    /// Events returned by the feed (zero on transport failure).
    pub fetched: usize,
    /// Whether the fetch failed.
    pub transport_failed: bool,
    pub merge: MergeSummary,
    /// Post-merge table contents handed to observers.
    pub snapshot: TableSnapshot,
}

pub struct SyncService<F> {
    poller: EventPoller<F>,
    engine: ReconciliationEngine,
    identity: IdentityResolver,
    observers: Vec<Box<dyn StateObserver>>,
    stats: SyncStats,
}

impl<F: EventFeed> SyncService<F> {
    pub fn new(config: &SyncConfig, feed: F, identity: impl IdentityProvider + 'static) -> Self {
        let poller = EventPoller::new(feed, config.filter())
            .with_limits(config.bootstrap_limit, config.page_limit);

        Self {
            poller,
            engine: ReconciliationEngine::new(),
            identity: IdentityResolver::new(identity),
            observers: Vec::new(),
            stats: SyncStats::default(),
        }
    }

    pub fn add_observer(&mut self, observer: impl StateObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Handle observers can read snapshots through.
    pub fn table(&self) -> SharedStateTable {
        self.engine.table()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        self.engine.table().snapshot()
    }

    pub fn cursor_state(&self) -> &PollCursorState {
        self.poller.state()
    }

    pub fn local_identity(&self) -> Option<&EntityIdentity> {
        self.identity.current()
    }

    // -----------------------------------------------------------------------
    // Main cycle
    // -----------------------------------------------------------------------

    /// Run one full cycle.  Never fails: transport errors yield an empty
    /// batch and malformed events are dropped inside the merge.
    pub async fn cycle(&mut self) -> CycleReport {
        self.stats.cycles += 1;
        let local = self.identity.resolve().cloned();

        let (events, transport_failed) = match self.poller.try_poll().await {
            Ok(events) => (events, false),
            Err(e) => {
                warn!(
                    "Cycle {}: fetch failed ({} in a row): {}",
                    self.stats.cycles,
                    self.poller.consecutive_failures(),
                    e
                );
                self.stats.transport_failures += 1;
                (Vec::new(), true)
            }
        };

        let merge = self.engine.apply_page(&events, local.as_ref());
        self.stats.events_fetched += events.len() as u64;
        self.stats.events_applied += merge.applied();
        self.stats.events_dropped += merge.dropped;
        self.stats.stale_events += merge.stale;
        self.stats.cursor = self.poller.state().next_cursor;

        // Observers run even on empty cycles so late subscribers catch up.
        let snapshot = self.snapshot();
        for observer in &mut self.observers {
            observer.materialize(&snapshot, local.as_ref());
        }
        self.stats.tracked_entities = snapshot.len();

        debug!(
            "Cycle {}: fetched={} applied={} stale={} dropped={} tracked={}",
            self.stats.cycles,
            events.len(),
            merge.applied(),
            merge.stale,
            merge.dropped,
            snapshot.len()
        );

        CycleReport {
            cycle: self.stats.cycles,
            fetched: events.len(),
            transport_failed,
            merge,
            snapshot,
        }
    }

    // -----------------------------------------------------------------------
    // Explicit removal
    // -----------------------------------------------------------------------

    /// Evict `identity` from the table and from every observer.
    ///
    /// Used when presentation code decides a remote actor is gone (e.g. it
    /// collided).  Idempotent.
    pub fn remove_entry(&mut self, identity: &EntityIdentity) -> Option<EntityState> {
        let removed = self.engine.remove_entry(identity);
        for observer in &mut self.observers {
            observer.evict(identity);
        }
        if removed.is_some() {
            info!("Removed actor {} on request", identity);
            self.stats.tracked_entities = self.engine.table().len();
        }
        removed
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.clone()
    }
}
