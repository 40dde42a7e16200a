//! Error types for the sync pipeline.
//!
//! None of these are fatal once the service is running: transport errors skip
//! a cycle, malformed payloads drop a single event and a missing identity
//! degrades to treating every sender as remote.  Only `Config` and `Replay`
//! abort startup.

/// Failure reported by the event feed collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The feed could not be reached.
    #[error("feed unreachable: {0}")]
    Unreachable(String),

    /// The feed did not answer in time.
    #[error("feed request timed out")]
    Timeout,

    /// The feed answered with something that is not a page of events.
    #[error("malformed feed response: {0}")]
    BadResponse(String),
}

/// Errors surfaced by the sync pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Event payload shorter than the fixed wire layout.
    #[error("malformed payload: expected at least {expected} bytes, got {len}")]
    MalformedPayload { len: usize, expected: usize },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No local identity could be resolved.
    #[error("no active local identity available")]
    MissingIdentity,

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// A recorded event log could not be loaded.
    #[error("replay error: {0}")]
    Replay(String),
}

impl From<config::ConfigError> for SyncError {
    fn from(e: config::ConfigError) -> Self {
        SyncError::Config(e.to_string())
    }
}
