//! SyncDriver loop tests

#![cfg(feature = "runtime")]

#[cfg(test)]
mod tests {
    use ledger_sync::{
        EntityIdentity, EntityState, EventCursor, FeedEventRecord, ReplayFeed, ShutdownToken,
        StaticIdentity, SyncConfig, SyncDriver, SyncService, Vector2Fixed,
    };
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn record(sender: &str, seq: u64, position: u64) -> FeedEventRecord {
        let state = EntityState::new(Vector2Fixed::new(seq, seq), Vector2Fixed::new(0, 0), seq, false);
        FeedEventRecord::from_state(sender, &state, 1_000 * position, EventCursor::new(position))
    }

    fn make_driver(feed: &ReplayFeed) -> SyncDriver<ReplayFeed> {
        let svc = SyncService::new(&SyncConfig::default(), feed.clone(), StaticIdentity::none());
        SyncDriver::new(svc, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn stops_at_cycle_limit() {
        let feed = ReplayFeed::from_records([record("0xA", 1, 1)]);
        let seen = Arc::new(AtomicU64::new(0));
        let counter = seen.clone();

        let stats = make_driver(&feed)
            .with_max_cycles(4)
            .on_cycle(move |report| {
                counter.store(report.cycle, Ordering::SeqCst);
            })
            .run(ShutdownToken::new())
            .await;

        assert_eq!(stats.cycles, 4);
        assert_eq!(seen.load(Ordering::SeqCst), 4);
        // One request per cycle: fetches are never overlapped.
        assert_eq!(feed.requests().len(), 4);
    }

    #[tokio::test]
    async fn shutdown_token_stops_the_loop() {
        let feed = ReplayFeed::from_records([record("0xA", 1, 1)]);
        let shutdown = ShutdownToken::new();
        let task = tokio::spawn(make_driver(&feed).run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        let stats = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("driver did not stop")
            .unwrap();
        assert!(stats.cycles >= 1);
        assert_eq!(stats.tracked_entities, 1);
    }

    #[tokio::test]
    async fn already_triggered_token_runs_no_cycles() {
        let feed = ReplayFeed::from_records([record("0xA", 1, 1)]);
        let shutdown = ShutdownToken::new();
        shutdown.trigger();

        // `select!` picks a ready branch at random; the loop may tick once.
        let stats = make_driver(&feed).run(shutdown).await;
        assert!(stats.cycles <= 1);
    }

    #[tokio::test]
    async fn handle_sees_table_and_queues_removals() {
        let feed = ReplayFeed::from_records([record("0xB", 1, 1)]);
        let driver = make_driver(&feed).with_max_cycles(3);
        let handle = driver.handle();
        let removal_handle = handle.clone();

        let driver = driver.on_cycle(move |report| {
            if report.cycle == 1 {
                removal_handle.remove_entry(EntityIdentity::from("0xB"));
            }
        });
        let stats = driver.run(ShutdownToken::new()).await;

        assert_eq!(stats.cycles, 3);
        assert!(handle.table().is_empty());
    }

    #[tokio::test]
    async fn removal_queued_in_last_cycle_is_applied_on_stop() {
        let feed = ReplayFeed::from_records([record("0xB", 1, 1)]);
        let driver = make_driver(&feed).with_max_cycles(2);
        let handle = driver.handle();
        let removal_handle = handle.clone();

        let driver = driver.on_cycle(move |report| {
            if report.cycle == 2 {
                removal_handle.remove_entry(EntityIdentity::from("0xB"));
            }
        });
        let stats = driver.run(ShutdownToken::new()).await;

        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.tracked_entities, 0);
        assert!(handle.table().is_empty());

        // The driver is gone; further requests are ignored.
        handle.remove_entry(EntityIdentity::from("0xB"));
    }
}
