//! Ledger Sync
//!
//! Keeps a local table of actor states in step with an append-only on-chain
//! event feed.
//!
//! ## Architecture
//!
//! ```text
//! SyncDriver  (driver.rs)          ← timer loop, shutdown token
//!   └── SyncService  (service.rs)  ← one poll/merge/materialize cycle
//!         ├── EventPoller  (poller.rs)          ← cursor bookkeeping
//!         │     └── dyn EventFeed  (feed.rs)    ← ledger RPC collaborator
//!         ├── ReconciliationEngine  (reconcile.rs)
//!         │     ├── decode_state  (protocol.rs) ← 41-byte payload
//!         │     └── StateTable  (table.rs)      ← last-writer-wins rows
//!         └── StateObserver  (observer.rs)      ← presentation hooks
//! ```
//!
//! The decode/merge core has no async runtime dependency.  The driver and
//! the client binary need the `runtime` feature.

pub mod error;
pub mod feed;
pub mod identity;
pub mod observer;
pub mod poller;
pub mod protocol;
pub mod reconcile;
pub mod service;
pub mod settings;
pub mod table;
pub mod types;

#[cfg(feature = "runtime")]
pub mod driver;

// Convenience re-exports
#[cfg(feature = "runtime")]
pub use driver::{ShutdownToken, SyncDriver, SyncHandle};
pub use error::{SyncError, TransportError};
pub use feed::{EventFeed, ReplayFeed};
pub use identity::{IdentityProvider, IdentityResolver, StaticIdentity};
pub use observer::{PresenceChange, RemoteActorTracker, StateObserver};
pub use poller::{EventPoller, FeedRequest, PollCursorState};
pub use protocol::{decode_state, encode_state, FeedEventRecord, PAYLOAD_LEN};
pub use reconcile::{apply_event, MergeOutcome, MergeSummary, ReconciliationEngine};
pub use service::{CycleReport, SyncService};
pub use settings::SyncConfig;
pub use table::{SharedStateTable, StateTable, TableSnapshot};
pub use types::{
    EntityIdentity, EntityState, EventCursor, EventFilter, Page, RawEvent, SyncStats,
    Vector2Fixed,
};
