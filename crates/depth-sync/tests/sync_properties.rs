//! End-to-end synchronization behaviour through the registry

mod common;

use common::*;
use depth_sync::{BookError, BookRegistry, ChangeKind, SyncConfig, SyncState, UpdateOutcome};
use depth_types::{LevelChange, PriceLevel};
use rust_decimal_macros::dec;

#[test]
fn test_snapshot_round_trip() {
    let registry = strict_registry();
    registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(10), true)
        .unwrap();

    let book = registry.get_book(&btc_usdt()).unwrap();
    assert_eq!(
        book.bids,
        vec![
            PriceLevel::new(dec!(100), dec!(1)),
            PriceLevel::new(dec!(99), dec!(2))
        ]
    );
    assert_eq!(
        book.asks,
        vec![
            PriceLevel::new(dec!(101), dec!(1)),
            PriceLevel::new(dec!(102), dec!(2))
        ]
    );
    assert_eq!(book.last_update_id, 10);
}

#[test]
fn test_level_removal() {
    let registry = strict_registry();
    registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(10), true)
        .unwrap();
    registry
        .update(&btc_usdt(), &update(11, vec![LevelChange::bid(dec!(100), dec!(0))]))
        .unwrap();

    assert_eq!(
        registry.get_book(&btc_usdt()).unwrap().bids,
        vec![PriceLevel::new(dec!(99), dec!(2))]
    );
}

#[test]
fn test_out_of_order_rejected_without_mutation() {
    let registry = strict_registry();
    registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(10), true)
        .unwrap();
    let before = registry.get_book(&btc_usdt()).unwrap();

    let err = registry
        .update(&btc_usdt(), &update(9, vec![LevelChange::ask(dec!(101), dec!(5))]))
        .unwrap_err();

    assert!(matches!(err, BookError::OutOfOrder { .. }));
    assert!(err.requires_resync());
    assert_eq!(registry.get_book(&btc_usdt()).unwrap(), before);
}

#[test]
fn test_duplicate_update_is_idempotent() {
    let registry = strict_registry();
    registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(10), true)
        .unwrap();

    let change = update(11, vec![LevelChange::bid(dec!(99.5), dec!(4))]);
    registry.update(&btc_usdt(), &change).unwrap();
    let after_first = registry.get_book(&btc_usdt()).unwrap();

    assert!(matches!(
        registry.update(&btc_usdt(), &change),
        Err(BookError::OutOfOrder { .. })
    ));
    assert_eq!(registry.get_book(&btc_usdt()).unwrap(), after_first);
}

#[test]
fn test_pre_snapshot_buffering() {
    let registry = strict_registry();
    let buffered = update(5, vec![LevelChange::ask(dec!(100.5), dec!(7))]);

    let outcome = registry.update(&btc_usdt(), &buffered).unwrap();
    assert_eq!(outcome, UpdateOutcome::Buffered { pending: 1 });
    let hidden = registry.get_book(&btc_usdt()).unwrap();
    assert!(hidden.bids.is_empty() && hidden.asks.is_empty());
    assert!(!hidden.has_snapshot());

    registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(3), true)
        .unwrap();

    let reference = strict_registry();
    reference
        .load_snapshot(&btc_usdt(), &simple_snapshot(3), true)
        .unwrap();
    reference.update(&btc_usdt(), &buffered).unwrap();

    assert_eq!(
        registry.get_book(&btc_usdt()).unwrap(),
        reference.get_book(&btc_usdt()).unwrap()
    );
    assert_eq!(
        registry.get_book(&btc_usdt()).unwrap().best_ask().unwrap().price,
        dec!(100.5)
    );
}

#[test]
fn test_stale_snapshot_is_ignorable() {
    let registry = strict_registry();
    registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(10), true)
        .unwrap();
    registry
        .update(&btc_usdt(), &update(15, vec![]))
        .unwrap();

    let err = registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(12), true)
        .unwrap_err();
    assert!(err.is_ignorable());
    assert_eq!(registry.get_book(&btc_usdt()).unwrap().last_update_id, 15);
}

#[test]
fn test_overflow_then_resync() {
    let registry = BookRegistry::new(
        SyncConfig::default()
            .with_buffer_capacity(3)
            .with_invariant_checks(true),
    )
    .unwrap();

    for id in 20..23 {
        registry.update(&btc_usdt(), &update(id, vec![])).unwrap();
    }
    let err = registry
        .update(&btc_usdt(), &update(23, vec![LevelChange::bid(dec!(100), dec!(5))]))
        .unwrap_err();
    assert!(matches!(err, BookError::BufferOverflow { evicted_through: 20, .. }));
    assert_eq!(registry.state(&btc_usdt()), Some(SyncState::ResyncRequired));

    // Snapshot older than the lost update cannot be reconciled
    assert!(matches!(
        registry.load_snapshot(&btc_usdt(), &simple_snapshot(15), true),
        Err(BookError::BufferOverflow { .. })
    ));
    assert!(!registry.get_book(&btc_usdt()).unwrap().has_snapshot());

    registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(21), true)
        .unwrap();
    let book = registry.get_book(&btc_usdt()).unwrap();
    assert_eq!(book.state, SyncState::Synced);
    assert_eq!(book.last_update_id, 23);
    assert_eq!(book.best_bid().unwrap().size, dec!(5));
}

#[test]
fn test_invalidate_then_resnapshot() {
    let registry = strict_registry();
    registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(10), true)
        .unwrap();
    let mut changes = registry.subscribe();

    registry.invalidate(&btc_usdt());
    assert!(matches!(
        registry.update(&btc_usdt(), &update(11, vec![])),
        Ok(UpdateOutcome::Buffered { .. })
    ));

    registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(10), true)
        .unwrap();
    let book = registry.get_book(&btc_usdt()).unwrap();
    assert_eq!(book.last_update_id, 11);

    // Invalidation and snapshot coalesce into one pending entry
    let change = changes.try_recv().unwrap();
    assert_eq!(change.kind, ChangeKind::Snapshot);
    assert!(change.top_of_book_changed);
    assert!(changes.try_recv().is_none());
}
