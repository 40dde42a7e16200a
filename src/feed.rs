//! Event feed collaborator.
//!
//! The ledger RPC client lives outside this crate; the sync pipeline only
//! sees the [`EventFeed`] trait.  [`ReplayFeed`] is an in-process feed over
//! a recorded event log, used by the client binary and the tests.

use crate::error::{SyncError, TransportError};
use crate::protocol::FeedEventRecord;
use crate::types::{EventCursor, EventFilter, Page};
use async_trait::async_trait;
use log::info;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Fetch up to `limit` events of the `filter` type.
    ///
    /// Ascending requests start strictly after `cursor` (or at the beginning
    /// of the log when `None`); descending requests start at the newest event.
    async fn fetch_events(
        &self,
        filter: &EventFilter,
        cursor: Option<EventCursor>,
        limit: usize,
        descending: bool,
    ) -> Result<Page, TransportError>;
}

// ---------------------------------------------------------------------------
// Replay feed
// ---------------------------------------------------------------------------

/// A request as seen by [`ReplayFeed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub filter: EventFilter,
    pub cursor: Option<EventCursor>,
    pub limit: usize,
    pub descending: bool,
}

#[derive(Debug, Default)]
struct ReplayLog {
    /// Sorted by cursor.
    records: Vec<FeedEventRecord>,
    pending_failures: VecDeque<TransportError>,
    requests: Vec<RecordedRequest>,
}

/// In-process feed over a recorded event log.
///
/// Cheap to clone; clones share the same log so tests can append events
/// while a service is polling.
#[derive(Debug, Clone, Default)]
pub struct ReplayFeed {
    log: Arc<Mutex<ReplayLog>>,
}

impl ReplayFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = FeedEventRecord>) -> Self {
        let feed = Self::new();
        feed.extend(records);
        feed
    }

    /// Load a JSON array of [`FeedEventRecord`]s.
    pub fn from_json_file(path: &Path) -> Result<Self, SyncError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Replay(format!("{}: {}", path.display(), e)))?;
        let records: Vec<FeedEventRecord> = serde_json::from_str(&raw)
            .map_err(|e| SyncError::Replay(format!("{}: {}", path.display(), e)))?;

        info!("Loaded {} recorded events from {}", records.len(), path.display());
        Ok(Self::from_records(records))
    }

    pub fn push(&self, record: FeedEventRecord) {
        self.extend(std::iter::once(record));
    }

    pub fn extend(&self, records: impl IntoIterator<Item = FeedEventRecord>) {
        let mut log = self.log.lock();
        log.records.extend(records);
        log.records.sort_by_key(|r| r.cursor);
    }

    /// Make the next request fail with `error`.  Failures queue up.
    pub fn fail_next(&self, error: TransportError) {
        self.log.lock().pending_failures.push_back(error);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().requests.clone()
    }
}

#[async_trait]
impl EventFeed for ReplayFeed {
    async fn fetch_events(
        &self,
        filter: &EventFilter,
        cursor: Option<EventCursor>,
        limit: usize,
        descending: bool,
    ) -> Result<Page, TransportError> {
        let mut log = self.log.lock();
        log.requests.push(RecordedRequest {
            filter: filter.clone(),
            cursor,
            limit,
            descending,
        });

        if let Some(error) = log.pending_failures.pop_front() {
            return Err(error);
        }

        let selected: Vec<FeedEventRecord> = if descending {
            log.records
                .iter()
                .rev()
                .filter(|r| cursor.map_or(true, |c| r.cursor < c))
                .take(limit)
                .cloned()
                .collect()
        } else {
            log.records
                .iter()
                .filter(|r| cursor.map_or(true, |c| r.cursor > c))
                .take(limit)
                .cloned()
                .collect()
        };
        drop(log);

        let next_cursor = selected.last().map(|r| r.cursor).or(cursor);

        let mut items = Vec::with_capacity(selected.len());
        for record in selected {
            if let Some(event) = record.into_raw_event()? {
                items.push(event);
            }
        }

        Ok(Page { items, next_cursor })
    }
}
