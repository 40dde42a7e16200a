//! EventPoller – cursor bookkeeping and page fetching.
//!
//! The first successful fetch only asks for the single newest event so a
//! fresh client starts at the head of the log instead of replaying history.
//! Every later fetch walks forward from the last cursor the feed handed back.

use crate::error::TransportError;
use crate::feed::EventFeed;
use crate::types::{EventCursor, EventFilter, Page, RawEvent};
use log::{debug, warn};

pub const DEFAULT_BOOTSTRAP_LIMIT: usize = 1;
pub const DEFAULT_PAGE_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// Cursor state
// ---------------------------------------------------------------------------

/// Shape of the next feed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRequest {
    pub cursor: Option<EventCursor>,
    pub limit: usize,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollCursorState {
    pub latest_event_seen: Option<RawEvent>,
    pub next_cursor: Option<EventCursor>,
}

impl PollCursorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bootstrap until an event has been observed.
    pub fn is_bootstrapping(&self) -> bool {
        self.latest_event_seen.is_none()
    }

    pub fn next_request(&self, bootstrap_limit: usize, page_limit: usize) -> FeedRequest {
        if self.is_bootstrapping() {
            FeedRequest {
                cursor: None,
                limit: bootstrap_limit,
                descending: true,
            }
        } else {
            FeedRequest {
                cursor: self.next_cursor,
                limit: page_limit,
                descending: false,
            }
        }
    }

    /// Fold a successfully fetched page into the state.
    pub fn advance(&mut self, page: &Page) {
        match (self.next_cursor, page.next_cursor) {
            (Some(current), Some(offered)) if offered < current => {
                warn!(
                    "Feed offered cursor {} behind {}, keeping current",
                    offered, current
                );
            }
            (_, Some(offered)) => self.next_cursor = Some(offered),
            // No hint from the feed: stay where we are.
            (_, None) => {}
        }

        for event in &page.items {
            let newer = self
                .latest_event_seen
                .as_ref()
                .map_or(true, |seen| event.timestamp > seen.timestamp);
            if newer {
                self.latest_event_seen = Some(event.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Owns the cursor state and the feed.  `poll_once` takes `&mut self`, so a
/// poller can never have two fetches in flight.
pub struct EventPoller<F> {
    feed: F,
    filter: EventFilter,
    state: PollCursorState,
    bootstrap_limit: usize,
    page_limit: usize,
    consecutive_failures: u64,
    total_failures: u64,
}

impl<F: EventFeed> EventPoller<F> {
    pub fn new(feed: F, filter: EventFilter) -> Self {
        Self {
            feed,
            filter,
            state: PollCursorState::new(),
            bootstrap_limit: DEFAULT_BOOTSTRAP_LIMIT,
            page_limit: DEFAULT_PAGE_LIMIT,
            consecutive_failures: 0,
            total_failures: 0,
        }
    }

    pub fn with_limits(mut self, bootstrap_limit: usize, page_limit: usize) -> Self {
        self.bootstrap_limit = bootstrap_limit;
        self.page_limit = page_limit;
        self
    }

    pub fn state(&self) -> &PollCursorState {
        &self.state
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    /// Fetch the next page.
    ///
    /// Events always come back oldest first, whatever the request direction.
    /// On failure the cursor state is left untouched and the error is
    /// returned so the caller can count it; nothing is retried here.
    pub async fn try_poll(&mut self) -> Result<Vec<RawEvent>, TransportError> {
        let request = self
            .state
            .next_request(self.bootstrap_limit, self.page_limit);

        let result = self
            .feed
            .fetch_events(
                &self.filter,
                request.cursor,
                request.limit,
                request.descending,
            )
            .await;

        match result {
            Ok(mut page) => {
                self.consecutive_failures = 0;
                if request.descending {
                    // Newest-first from the feed; merge wants log order, and
                    // the forward walk resumes after the newest event seen.
                    page.items.reverse();
                    if let Some(newest) = page.items.last() {
                        page.next_cursor = page.next_cursor.max(Some(newest.cursor));
                    }
                }
                self.state.advance(&page);
                self.state.advance(&page);
                debug!(
                    "Fetched {} events (cursor {:?} -> {:?})",
                    page.items.len(),
                    request.cursor,
                    self.state.next_cursor
                );
                Ok(page.items)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.total_failures += 1;
                Err(e)
            }
        }
    }

    /// Fetch the next page, treating any failure as an empty page.
    pub async fn poll_once(&mut self) -> Vec<RawEvent> {
        match self.try_poll().await {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    "Event fetch failed ({} in a row): {}",
                    self.consecutive_failures, e
                );
                Vec::new()
            }
        }
    }
}
