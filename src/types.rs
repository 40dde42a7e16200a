//! Core sync types shared across all modules.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Address of an on-chain actor.  Stable for the actor's lifetime and used as
/// the [`StateTable`](crate::table::StateTable) key.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityIdentity(String);

impl EntityIdentity {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityIdentity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Fixed-point math
// ---------------------------------------------------------------------------

/// 2D vector with raw unsigned 64-bit axes, exactly as published on-chain.
///
/// Values are never range-checked; conversion to floats happens only at the
/// consumption edge.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Vector2Fixed {
    x: u64,
    y: u64,
}

impl Vector2Fixed {
    pub const fn new(x: u64, y: u64) -> Self {
        Self { x, y }
    }

    pub const fn raw_x(&self) -> u64 {
        self.x
    }

    pub const fn raw_y(&self) -> u64 {
        self.y
    }

    pub fn to_f64(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }

    pub fn to_f32(&self) -> (f32, f32) {
        (self.x as f32, self.y as f32)
    }

    /// Interpret the raw axes as fixed-point numbers with `divisor` units per
    /// whole number (e.g. `1_000` for milli-units).
    pub fn scaled(&self, divisor: f64) -> (f64, f64) {
        let (x, y) = self.to_f64();
        (x / divisor, y / divisor)
    }
}

impl fmt::Display for Vector2Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Entity state
// ---------------------------------------------------------------------------

/// One actor's authoritative physical state at a point in logical time.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub position: Vector2Fixed,
    pub velocity: Vector2Fixed,
    /// Per-entity logical clock; higher is newer.
    pub sequence_number: u64,
    /// Set once the actor has been destroyed.
    pub is_terminated: bool,
}

impl EntityState {
    pub const fn new(
        position: Vector2Fixed,
        velocity: Vector2Fixed,
        sequence_number: u64,
        is_terminated: bool,
    ) -> Self {
        Self {
            position,
            velocity,
            sequence_number,
            is_terminated,
        }
    }
}

// ---------------------------------------------------------------------------
// Feed positions and events
// ---------------------------------------------------------------------------

/// Opaque position in the remote event log, ordered by the feed.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCursor(u64);

impl EventCursor {
    pub const fn new(position: u64) -> Self {
        Self(position)
    }

    pub const fn position(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An undecoded event as delivered by the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub sender: EntityIdentity,
    pub payload: Bytes,
    /// Ledger timestamp in milliseconds.
    pub timestamp: u64,
    pub cursor: EventCursor,
}

impl RawEvent {
    pub fn new(
        sender: impl Into<EntityIdentity>,
        payload: impl Into<Bytes>,
        timestamp: u64,
        cursor: EventCursor,
    ) -> Self {
        Self {
            sender: sender.into(),
            payload: payload.into(),
            timestamp,
            cursor,
        }
    }
}

/// One page of feed results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<RawEvent>,
    /// Where the next page starts; `None` when the feed gave no hint.
    pub next_cursor: Option<EventCursor>,
}

/// Identifies the single event type the poller follows.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct EventFilter {
    pub move_event: String,
}

impl EventFilter {
    pub fn new(move_event: impl Into<String>) -> Self {
        Self {
            move_event: move_event.into(),
        }
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.move_event)
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    pub cycles: u64,
    pub events_fetched: u64,
    pub events_applied: u64,
    pub events_dropped: u64,
    pub stale_events: u64,
    pub transport_failures: u64,
    pub tracked_entities: usize,
    pub cursor: Option<EventCursor>,
}
