//! Reconciliation – last-writer-wins merge of decoded events into the table.
//!
//! ## Merge rule
//!
//! | Row for sender | Event                         | Effect            |
//! |----------------|-------------------------------|-------------------|
//! | present        | local sender, terminated      | row removed       |
//! | present        | sequence > held sequence      | row replaced      |
//! | present        | sequence <= held sequence     | ignored (stale)   |
//! | absent         | not terminated                | row inserted      |
//! | absent         | terminated                    | ignored           |
//!
//! Remote rows are never removed by a terminated flag alone; that is the job
//! of the explicit removal hook.

use crate::protocol::decode_state;
use crate::table::{SharedStateTable, StateTable};
use crate::types::{EntityIdentity, EntityState, RawEvent};
use log::{debug, warn};
use std::collections::hash_map::Entry;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a single event did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced { previous_sequence: u64 },
    /// Local actor's own terminal event cleared its row.
    Removed,
    /// Sequence number not newer than the held one.
    Stale { held: u64, offered: u64 },
    /// Terminal event for an entity with no row.
    TerminalIgnored,
    /// Payload could not be decoded.
    Dropped,
}

impl MergeOutcome {
    /// Whether the table changed.
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            MergeOutcome::Inserted | MergeOutcome::Replaced { .. } | MergeOutcome::Removed
        )
    }
}

/// Per-page tally of merge outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: u64,
    pub replaced: u64,
    pub removed: u64,
    pub stale: u64,
    pub terminal_ignored: u64,
    pub dropped: u64,
}

impl MergeSummary {
    pub fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Replaced { .. } => self.replaced += 1,
            MergeOutcome::Removed => self.removed += 1,
            MergeOutcome::Stale { .. } => self.stale += 1,
            MergeOutcome::TerminalIgnored => self.terminal_ignored += 1,
            MergeOutcome::Dropped => self.dropped += 1,
        }
    }

    pub fn applied(&self) -> u64 {
        self.inserted + self.replaced + self.removed
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Decode `event` and merge it into `table`.
///
/// A malformed payload is logged and dropped; the table is left untouched.
pub fn apply_event(
    table: &mut StateTable,
    event: &RawEvent,
    local: Option<&EntityIdentity>,
) -> MergeOutcome {
    let state = match decode_state(&event.payload) {
        Ok(state) => state,
        Err(e) => {
            warn!(
                "Dropping event {} from {}: {}",
                event.cursor, event.sender, e
            );
            return MergeOutcome::Dropped;
        }
    };

    let is_local = local == Some(&event.sender);
    merge_state(table, event.sender.clone(), state, is_local)
}

/// Merge an already-decoded state for `sender`.
pub fn merge_state(
    table: &mut StateTable,
    sender: EntityIdentity,
    state: EntityState,
    is_local: bool,
) -> MergeOutcome {
    match table.entry(sender) {
        Entry::Occupied(mut row) => {
            let held = row.get().sequence_number;
            if is_local && state.is_terminated {
                debug!("Local actor {} terminated, clearing row", row.key());
                row.remove();
                MergeOutcome::Removed
            } else if state.sequence_number > held {
                row.insert(state);
                MergeOutcome::Replaced {
                    previous_sequence: held,
                }
            } else {
                MergeOutcome::Stale {
                    held,
                    offered: state.sequence_number,
                }
            }
        }
        Entry::Vacant(slot) => {
            if state.is_terminated {
                MergeOutcome::TerminalIgnored
            } else {
                debug!("New actor {} at {}", slot.key(), state.position);
                slot.insert(state);
                MergeOutcome::Inserted
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Sole writer of a [`SharedStateTable`].
#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    table: SharedStateTable,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for observers.
    pub fn table(&self) -> SharedStateTable {
        self.table.clone()
    }

    pub fn apply(&self, event: &RawEvent, local: Option<&EntityIdentity>) -> MergeOutcome {
        apply_event(&mut self.table.write(), event, local)
    }

    /// Apply a page of events in feed order under a single write lock.
    pub fn apply_page(&self, events: &[RawEvent], local: Option<&EntityIdentity>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let mut table = self.table.write();
        for event in events {
            summary.record(apply_event(&mut table, event, local));
        }
        summary
    }

    pub fn remove_entry(&self, identity: &EntityIdentity) -> Option<EntityState> {
        self.table.write().remove_entry(identity)
    }
}
