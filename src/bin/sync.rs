//! ledger-sync-client binary
//!
//! Replays a recorded event log through the sync pipeline on a timer and
//! prints the final stats as JSON.
//!
//! ## Configuration (env / TOML via `config` crate, CLI on top)
//!
//! | Key                            | Default                   | Description              |
//! |--------------------------------|---------------------------|--------------------------|
//! | `LEDGER_SYNC_PACKAGE_ID`       | `0x0`                     | Package of the event type |
//! | `LEDGER_SYNC_EVENT_MODULE`     | `playerstate_module`      | Emitting module          |
//! | `LEDGER_SYNC_EVENT_NAME`       | `PlayerStateUpdatedEvent` | Event struct name        |
//! | `LEDGER_SYNC_BOOTSTRAP_LIMIT`  | `1`                       | Events fetched on start  |
//! | `LEDGER_SYNC_PAGE_LIMIT`       | `20`                      | Events per page          |
//! | `LEDGER_SYNC_POLL_INTERVAL_MS` | `250`                     | Cycle period             |
//! | `LEDGER_SYNC_LOCAL_IDENTITY`   | *(unset)*                 | Local actor address      |

use anyhow::{Context, Result};
use clap::Parser;
use ledger_sync::{
    driver::{ShutdownToken, SyncDriver},
    feed::ReplayFeed,
    identity::StaticIdentity,
    observer::{PresenceChange, RemoteActorTracker},
    service::SyncService,
    settings::SyncConfig,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "ledger-sync-client", about = "Ledger state sync client", version)]
struct Args {
    /// Recorded event log (JSON array of feed records)
    #[arg(long, env = "LEDGER_SYNC_REPLAY")]
    replay: PathBuf,

    /// Optional TOML config file
    #[arg(long, env = "LEDGER_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Local actor address (overrides config)
    #[arg(long)]
    local_identity: Option<String>,

    /// Cycle period in milliseconds (overrides config)
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Stop after this many cycles instead of waiting for Ctrl-C
    #[arg(long)]
    max_cycles: Option<u64>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ledger_sync=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = SyncConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(identity) = args.local_identity {
        config.local_identity = Some(identity);
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = ms;
    }

    log::info!(
        "Starting ledger-sync-client (filter='{}', interval={}ms, local={:?})",
        config.filter(),
        config.poll_interval_ms,
        config.local_identity,
    );

    let feed = ReplayFeed::from_json_file(&args.replay).context("Failed to load replay log")?;

    let tracker = Arc::new(Mutex::new(RemoteActorTracker::new()));
    let mut service = SyncService::new(
        &config,
        feed,
        StaticIdentity::new(config.local_identity()),
    );
    service.add_observer(tracker.clone());

    let mut driver = SyncDriver::new(service, config.poll_interval()).on_cycle(move |report| {
        for change in tracker.lock().drain_changes() {
            match change {
                PresenceChange::Spawned(id) => log::info!("+ {} (cycle {})", id, report.cycle),
                PresenceChange::Despawned(id) => log::info!("- {} (cycle {})", id, report.cycle),
            }
        }
    });
    if let Some(n) = args.max_cycles {
        driver = driver.with_max_cycles(n);
    }

    let shutdown = ShutdownToken::new();
    let mut task = tokio::spawn(driver.run(shutdown.clone()));

    let stats = tokio::select! {
        // Cycle cap reached.
        done = &mut task => done.context("Sync driver task panicked")?,
        _ = tokio::signal::ctrl_c() => {
            log::info!("ledger-sync-client shutting down (SIGINT)");
            shutdown.trigger();
            task.await.context("Sync driver task panicked")?
        }
    };
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
