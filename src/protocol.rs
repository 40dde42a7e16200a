//! Ledger wire protocol.
//!
//! This module owns **every byte layout that crosses the feed boundary**:
//! the fixed 41-byte entity-state payload and the serde form of a feed event
//! record as the ledger RPC reports it.
//!
//! ## Payload layout (little-endian)
//!
//! | Offset | Size | Field            |
//! |--------|------|------------------|
//! | 0      | 8    | position x (u64) |
//! | 8      | 8    | position y (u64) |
//! | 16     | 8    | velocity x (u64) |
//! | 24     | 8    | velocity y (u64) |
//! | 32     | 8    | sequence number  |
//! | 40     | 1    | terminated flag  |
//!
//! Trailing bytes are ignored.  Values are not range-checked.

use crate::error::{SyncError, TransportError};
use crate::types::{EntityState, EventCursor, RawEvent, Vector2Fixed};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entity-state payload
// ---------------------------------------------------------------------------

/// Minimum payload length accepted by [`decode_state`].
pub const PAYLOAD_LEN: usize = 41;

const POS_X: usize = 0;
const POS_Y: usize = 8;
const VEL_X: usize = 16;
const VEL_Y: usize = 24;
const SEQUENCE: usize = 32;
const TERMINATED: usize = 40;

/// Decode an entity-state payload.
pub fn decode_state(bytes: &[u8]) -> Result<EntityState, SyncError> {
    if bytes.len() < PAYLOAD_LEN {
        return Err(SyncError::MalformedPayload {
            len: bytes.len(),
            expected: PAYLOAD_LEN,
        });
    }

    Ok(EntityState {
        position: Vector2Fixed::new(read_u64(bytes, POS_X), read_u64(bytes, POS_Y)),
        velocity: Vector2Fixed::new(read_u64(bytes, VEL_X), read_u64(bytes, VEL_Y)),
        sequence_number: read_u64(bytes, SEQUENCE),
        is_terminated: bytes[TERMINATED] != 0,
    })
}

/// Encode a state into the wire layout.  Used when recording event logs.
pub fn encode_state(state: &EntityState) -> [u8; PAYLOAD_LEN] {
    let mut out = [0u8; PAYLOAD_LEN];
    out[POS_X..POS_Y].copy_from_slice(&state.position.raw_x().to_le_bytes());
    out[POS_Y..VEL_X].copy_from_slice(&state.position.raw_y().to_le_bytes());
    out[VEL_X..VEL_Y].copy_from_slice(&state.velocity.raw_x().to_le_bytes());
    out[VEL_Y..SEQUENCE].copy_from_slice(&state.velocity.raw_y().to_le_bytes());
    out[SEQUENCE..TERMINATED].copy_from_slice(&state.sequence_number.to_le_bytes());
    out[TERMINATED] = u8::from(state.is_terminated);
    out
}

// Caller guarantees `bytes.len() >= at + 8`.
fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(word)
}

// ---------------------------------------------------------------------------
// Feed event records
// ---------------------------------------------------------------------------

/// One event as reported by the ledger RPC.
///
/// `bcs` carries the base64-encoded payload; it is absent for events that are
/// not move events, which the sync pipeline ignores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEventRecord {
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcs: Option<String>,
    pub timestamp_ms: u64,
    pub cursor: EventCursor,
}

impl FeedEventRecord {
    /// Build a record carrying `state` as its payload.
    pub fn from_state(
        sender: impl Into<String>,
        state: &EntityState,
        timestamp_ms: u64,
        cursor: EventCursor,
    ) -> Self {
        Self {
            sender: sender.into(),
            bcs: Some(STANDARD.encode(encode_state(state))),
            timestamp_ms,
            cursor,
        }
    }

    /// Convert into a [`RawEvent`].
    ///
    /// Returns `Ok(None)` for records without a payload and
    /// [`TransportError::BadResponse`] when the payload is not valid base64.
    pub fn into_raw_event(self) -> Result<Option<RawEvent>, TransportError> {
        let Some(bcs) = self.bcs else {
            return Ok(None);
        };

        let payload = STANDARD.decode(bcs.as_bytes()).map_err(|e| {
            TransportError::BadResponse(format!("bad payload at {}: {}", self.cursor, e))
        })?;

        Ok(Some(RawEvent::new(
            self.sender,
            payload,
            self.timestamp_ms,
            self.cursor,
        )))
    }
}
