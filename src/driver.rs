//! Driver – runs the sync cycle on a fixed timer until shut down.
//!
//! ## Loop contract
//!
//! | Step | Action                                              |
//! |------|-----------------------------------------------------|
//! | 1    | wait for the next tick (or shutdown)                |
//! | 2    | apply queued external removals                      |
//! | 3    | await one full [`SyncService::cycle`]               |
//!
//! A cycle is always awaited to completion before the next tick is taken, so
//! at most one fetch is in flight and pages are merged in order.  Shutdown is
//! only observed between cycles.

use crate::feed::EventFeed;
use crate::service::{CycleReport, SyncService};
use crate::table::SharedStateTable;
use crate::types::{EntityIdentity, SyncStats};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{info, info_span, Instrument};

// ---------------------------------------------------------------------------
// Shutdown token
// ---------------------------------------------------------------------------

/// Cloneable stop signal for a [`SyncDriver`].
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so `wait_for` can't see a closed channel.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Handle for other tasks
// ---------------------------------------------------------------------------

/// What presentation code gets while the driver owns the service.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    table: SharedStateTable,
    removals: mpsc::UnboundedSender<EntityIdentity>,
}

impl SyncHandle {
    pub fn table(&self) -> &SharedStateTable {
        &self.table
    }

    /// Queue an explicit removal; applied before the next cycle.
    pub fn remove_entry(&self, identity: EntityIdentity) {
        if self.removals.send(identity).is_err() {
            log::debug!("Driver stopped, removal request ignored");
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct SyncDriver<F> {
    service: SyncService<F>,
    interval: Duration,
    max_cycles: Option<u64>,
    removals_rx: mpsc::UnboundedReceiver<EntityIdentity>,
    removals_tx: mpsc::UnboundedSender<EntityIdentity>,
    on_cycle: Option<Box<dyn FnMut(&CycleReport) + Send>>,
}

impl<F: EventFeed + 'static> SyncDriver<F> {
    pub fn new(service: SyncService<F>, interval: Duration) -> Self {
        let (removals_tx, removals_rx) = mpsc::unbounded_channel();
        Self {
            service,
            interval,
            max_cycles: None,
            removals_rx,
            removals_tx,
            on_cycle: None,
        }
    }

    /// Stop on its own after `n` cycles.
    pub fn with_max_cycles(mut self, n: u64) -> Self {
        self.max_cycles = Some(n);
        self
    }

    /// Callback run after each cycle, on the driver task.
    pub fn on_cycle(mut self, f: impl FnMut(&CycleReport) + Send + 'static) -> Self {
        self.on_cycle = Some(Box::new(f));
        self
    }

    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            table: self.service.table(),
            removals: self.removals_tx.clone(),
        }
    }

    /// Run until `shutdown` fires or the cycle cap is reached.  Returns the
    /// final stats.
    pub async fn run(mut self, shutdown: ShutdownToken) -> SyncStats {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Sync driver started"
        );

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                _ = shutdown.triggered() => {
                    info!("Sync driver shutting down");
                    break;
                }
                _ = timer.tick() => {
                    while let Ok(identity) = self.removals_rx.try_recv() {
                        self.service.remove_entry(&identity);
                    }

                    cycles += 1;
                    let report = self
                        .service
                        .cycle()
                        .instrument(info_span!("sync_cycle", cycle = cycles))
                        .await;

                    if let Some(f) = self.on_cycle.as_mut() {
                        f(&report);
                    }

                    if self.max_cycles.is_some_and(|max| cycles >= max) {
                        info!(cycles, "Sync driver reached cycle limit");
                        break;
                    }
                }
            }
        }

        // Removals queued after the last cycle still reach the table.
        self.removals_rx.close();
        let mut late = 0u64;
        while let Ok(identity) = self.removals_rx.try_recv() {
            self.service.remove_entry(&identity);
            late += 1;
        }
        if late > 0 {
            info!(late, "Applied removals queued after the last cycle");
        }

        self.service.stats()
    }
}
