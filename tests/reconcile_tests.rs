//! Reconciliation (last-writer-wins merge) tests

#[cfg(test)]
mod tests {
    use ledger_sync::{
        apply_event, encode_state, EntityIdentity, EntityState, EventCursor, MergeOutcome,
        RawEvent, ReconciliationEngine, StateTable, Vector2Fixed,
    };

    fn state(seq: u64, terminated: bool) -> EntityState {
        EntityState::new(
            Vector2Fixed::new(seq * 10, seq * 20),
            Vector2Fixed::new(1, 0),
            seq,
            terminated,
        )
    }

    fn event(sender: &str, seq: u64, terminated: bool) -> RawEvent {
        RawEvent::new(
            sender,
            encode_state(&state(seq, terminated)).to_vec(),
            1_000 + seq,
            EventCursor::new(seq),
        )
    }

    fn id(s: &str) -> EntityIdentity {
        EntityIdentity::from(s)
    }

    // -----------------------------------------------------------------------
    // Insertion
    // -----------------------------------------------------------------------

    #[test]
    fn first_event_inserts_row() {
        let mut table = StateTable::new();
        let payload = encode_state(&EntityState::new(
            Vector2Fixed::new(100, 200),
            Vector2Fixed::new(1, 0),
            1,
            false,
        ));
        let ev = RawEvent::new("0xA", payload.to_vec(), 5, EventCursor::new(1));

        assert_eq!(apply_event(&mut table, &ev, None), MergeOutcome::Inserted);

        let row = table.get(&id("0xA")).unwrap();
        assert_eq!(row.position.to_f64(), (100.0, 200.0));
        assert_eq!(row.velocity.to_f64(), (1.0, 0.0));
        assert_eq!(row.sequence_number, 1);
        assert!(!row.is_terminated);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remote_terminal_for_unknown_entity_is_ignored() {
        let mut table = StateTable::new();
        let outcome = apply_event(&mut table, &event("0xB", 4, true), None);
        assert_eq!(outcome, MergeOutcome::TerminalIgnored);
        assert!(!table.contains(&id("0xB")));
    }

    #[test]
    fn local_terminal_for_unknown_entity_is_ignored() {
        let mut table = StateTable::new();
        let local = id("0xA");
        let outcome = apply_event(&mut table, &event("0xA", 4, true), Some(&local));
        assert_eq!(outcome, MergeOutcome::TerminalIgnored);
        assert!(table.is_empty());
    }

    // -----------------------------------------------------------------------
    // Ordering
    // -----------------------------------------------------------------------

    #[test]
    fn applying_twice_equals_applying_once() {
        let mut once = StateTable::new();
        let mut twice = StateTable::new();
        let ev = event("0xA", 3, false);

        apply_event(&mut once, &ev, None);
        apply_event(&mut twice, &ev, None);
        let second = apply_event(&mut twice, &ev, None);

        assert_eq!(second, MergeOutcome::Stale { held: 3, offered: 3 });
        assert!(!second.is_applied());
        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn older_sequence_is_dropped() {
        let mut table = StateTable::new();
        apply_event(&mut table, &event("0xC", 5, false), None);

        let outcome = apply_event(&mut table, &event("0xC", 3, false), None);
        assert_eq!(outcome, MergeOutcome::Stale { held: 5, offered: 3 });
        assert_eq!(table.get(&id("0xC")).unwrap().sequence_number, 5);
        assert_eq!(table.get(&id("0xC")).unwrap().position.raw_x(), 50);
    }

    #[test]
    fn newer_sequence_replaces_row() {
        let mut table = StateTable::new();
        apply_event(&mut table, &event("0xC", 5, false), None);

        let outcome = apply_event(&mut table, &event("0xC", 9, false), None);
        assert_eq!(
            outcome,
            MergeOutcome::Replaced {
                previous_sequence: 5
            }
        );
        assert_eq!(table.get(&id("0xC")).unwrap().sequence_number, 9);
    }

    #[test]
    fn sequence_numbers_never_decrease() {
        let mut table = StateTable::new();
        let mut highest = 0;
        for seq in [4, 2, 7, 7, 1, 9, 3, 8, 12, 11] {
            apply_event(&mut table, &event("0xD", seq, false), None);
            let held = table.get(&id("0xD")).unwrap().sequence_number;
            assert!(held >= highest, "sequence went from {} to {}", highest, held);
            highest = held;
        }
        assert_eq!(highest, 12);
    }

    #[test]
    fn sequence_numbers_are_per_entity() {
        let mut table = StateTable::new();
        apply_event(&mut table, &event("0xA", 50, false), None);
        let outcome = apply_event(&mut table, &event("0xB", 1, false), None);
        assert_eq!(outcome, MergeOutcome::Inserted);
        assert_eq!(table.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Termination
    // -----------------------------------------------------------------------

    #[test]
    fn local_terminal_removes_row_regardless_of_sequence() {
        let local = id("0xA");
        for terminal_seq in [1, 5, 10] {
            let mut table = StateTable::new();
            apply_event(&mut table, &event("0xA", 5, false), Some(&local));

            let outcome = apply_event(&mut table, &event("0xA", terminal_seq, true), Some(&local));
            assert_eq!(outcome, MergeOutcome::Removed);
            assert!(!table.contains(&local));
        }
    }

    #[test]
    fn remote_terminal_only_replaces_row() {
        let mut table = StateTable::new();
        apply_event(&mut table, &event("0xB", 5, false), Some(&id("0xA")));

        let outcome = apply_event(&mut table, &event("0xB", 6, true), Some(&id("0xA")));
        assert_eq!(
            outcome,
            MergeOutcome::Replaced {
                previous_sequence: 5
            }
        );
        assert!(table.get(&id("0xB")).unwrap().is_terminated);
    }

    #[test]
    fn without_local_identity_own_terminal_is_treated_as_remote() {
        let mut table = StateTable::new();
        apply_event(&mut table, &event("0xA", 5, false), None);

        let outcome = apply_event(&mut table, &event("0xA", 5, true), None);
        assert_eq!(outcome, MergeOutcome::Stale { held: 5, offered: 5 });
        assert!(table.contains(&id("0xA")));
    }

    #[test]
    fn explicit_removal_is_idempotent() {
        let mut table = StateTable::new();
        apply_event(&mut table, &event("0xB", 2, false), None);

        assert!(table.remove_entry(&id("0xB")).is_some());
        assert!(table.remove_entry(&id("0xB")).is_none());
        assert!(table.is_empty());
    }

    // -----------------------------------------------------------------------
    // Malformed payloads
    // -----------------------------------------------------------------------

    #[test]
    fn malformed_event_is_dropped_and_stream_continues() {
        let engine = ReconciliationEngine::new();
        let bad = RawEvent::new("0xE", vec![0u8; 12], 1, EventCursor::new(1));
        let page = vec![event("0xA", 1, false), bad, event("0xB", 1, false)];

        let summary = engine.apply_page(&page, None);

        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.inserted, 2);
        let table = engine.table();
        assert_eq!(table.len(), 2);
        assert!(table.get(&id("0xE")).is_none());
    }

    #[test]
    fn page_is_applied_in_feed_order() {
        let engine = ReconciliationEngine::new();
        let local = id("0xA");
        // Insert, remove (local terminal), then re-insert with a later state.
        let page = vec![
            event("0xA", 1, false),
            event("0xA", 2, true),
            event("0xA", 3, false),
        ];

        let summary = engine.apply_page(&page, Some(&local));

        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.removed, 1);
        assert_eq!(engine.table().get(&local).unwrap().sequence_number, 3);
    }

    #[test]
    fn engine_apply_writes_through_shared_handle() {
        let engine = ReconciliationEngine::new();
        let observer_view = engine.table();

        assert_eq!(engine.apply(&event("0xA", 2, false), None), MergeOutcome::Inserted);
        assert_eq!(observer_view.get(&id("0xA")).unwrap().sequence_number, 2);

        let before = observer_view.snapshot();
        engine.apply(&event("0xA", 3, false), None);
        assert_eq!(before.get(&id("0xA")).unwrap().sequence_number, 2);
        assert_eq!(observer_view.snapshot().get(&id("0xA")).unwrap().sequence_number, 3);
    }
}
