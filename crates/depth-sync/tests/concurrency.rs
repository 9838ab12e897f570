//! Concurrent ingestion, reads and subscriptions

mod common;

use common::*;
use depth_sync::{BookRegistry, ChangeKind, SyncConfig};
use depth_types::{BookUpdate, CurrencyPair, InstrumentKey, LevelChange};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const INSTRUMENTS: usize = 8;
const UPDATES: u64 = 500;

fn instrument(i: usize) -> InstrumentKey {
    InstrumentKey::spot("binance", CurrencyPair::new(format!("C{i}"), "USDT"))
}

/// Deterministic per-instrument update stream
fn script(i: usize) -> Vec<BookUpdate> {
    (1..=UPDATES)
        .map(|id| {
            let price = Decimal::from(90 + ((id as usize * 7 + i) % 20) as i64);
            let size = Decimal::from(((id as usize + i) % 4) as i64);
            let change = if id % 2 == 0 {
                LevelChange::bid(price, size)
            } else {
                LevelChange::ask(price + Decimal::from(20), size)
            };
            BookUpdate::new(10 + id, vec![change], ts(id as i64))
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disjoint_instruments_match_sequential_replay() {
    let registry = Arc::new(strict_registry());

    let mut tasks = Vec::new();
    for i in 0..INSTRUMENTS {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            let key = instrument(i);
            registry.load_snapshot(&key, &simple_snapshot(10), true).unwrap();
            for update in script(i) {
                registry.update(&key, &update).unwrap();
                if update.update_id % 50 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }

    // Readers never observe a torn book
    let reader = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            for _ in 0..200 {
                for i in 0..INSTRUMENTS {
                    if let Ok(view) = registry.get_book(&instrument(i)) {
                        assert!(view.bids.windows(2).all(|w| w[0].price > w[1].price));
                        assert!(view.asks.windows(2).all(|w| w[0].price < w[1].price));
                        assert!(view.bids.iter().all(|l| l.size > Decimal::ZERO));
                    }
                }
                tokio::task::yield_now().await;
            }
        })
    };

    for task in tasks {
        task.await.unwrap();
    }
    reader.await.unwrap();

    for i in 0..INSTRUMENTS {
        let sequential = strict_registry();
        let key = instrument(i);
        sequential.load_snapshot(&key, &simple_snapshot(10), true).unwrap();
        for update in script(i) {
            sequential.update(&key, &update).unwrap();
        }

        assert_eq!(
            registry.get_book(&key).unwrap(),
            sequential.get_book(&key).unwrap()
        );
    }
    assert_eq!(registry.len(), INSTRUMENTS);
}

#[test]
fn test_threads_on_disjoint_instruments() {
    let registry = Arc::new(strict_registry());

    std::thread::scope(|scope| {
        for i in 0..INSTRUMENTS {
            let registry = &registry;
            scope.spawn(move || {
                let key = instrument(i);
                for update in script(i) {
                    registry.update(&key, &update).unwrap();
                }
                registry.load_snapshot(&key, &simple_snapshot(10), true).unwrap();
            });
        }
    });

    for i in 0..INSTRUMENTS {
        let book = registry.get_book(&instrument(i)).unwrap();
        assert_eq!(book.last_update_id, 10 + UPDATES);
    }
}

#[test]
fn test_invalidate_races_updates_on_one_instrument() {
    let registry = strict_registry();
    let key = instrument(0);
    registry.load_snapshot(&key, &simple_snapshot(10), true).unwrap();

    std::thread::scope(|scope| {
        let registry = &registry;
        let key = &key;

        scope.spawn(move || {
            for update in script(0) {
                // Sequencing errors are expected while resyncs interleave
                let _ = registry.update(key, &update);
            }
        });

        scope.spawn(move || {
            for round in 0..100u64 {
                assert!(registry.invalidate(key));
                let _ = registry.load_snapshot(key, &simple_snapshot(10 + round * 5), true);
            }
        });

        scope.spawn(move || {
            for _ in 0..500 {
                let view = registry.get_book(key).unwrap();
                if view.has_snapshot() {
                    assert!(view.bids.windows(2).all(|w| w[0].price > w[1].price));
                    assert!(view.asks.windows(2).all(|w| w[0].price < w[1].price));
                    assert!(view.bids.iter().chain(&view.asks).all(|l| l.size > Decimal::ZERO));
                } else {
                    assert!(view.bids.is_empty() && view.asks.is_empty());
                    assert_eq!(view.last_update_id, 0);
                }
            }
        });
    });

    assert!(registry.get(&key).unwrap().read().verify().is_ok());

    // A clean resync always recovers the book
    registry.invalidate(&key);
    registry
        .load_snapshot(&key, &simple_snapshot(10 + UPDATES), true)
        .unwrap();
    let bid = LevelChange::bid(Decimal::from(100), Decimal::from(3));
    registry.update(&key, &update(11 + UPDATES, vec![bid])).unwrap();
    let view = registry.get_book(&key).unwrap();
    assert!(view.has_snapshot());
    assert_eq!(view.last_update_id, 11 + UPDATES);
}

#[tokio::test]
async fn test_subscriber_receives_changes() {
    let registry = Arc::new(strict_registry());
    let mut changes = registry.subscribe();

    let producer = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            registry
                .load_snapshot(&btc_usdt(), &simple_snapshot(1), true)
                .unwrap();
        })
    };
    producer.await.unwrap();

    let change = timeout(Duration::from_secs(1), changes.recv())
        .await
        .expect("notification timed out")
        .expect("stream ended");
    assert_eq!(change.key, btc_usdt());
    assert_eq!(change.kind, ChangeKind::Snapshot);

    registry.close();
    assert!(changes.recv().await.is_none());
}

#[tokio::test]
async fn test_slow_subscriber_never_blocks_ingestion() {
    let registry = BookRegistry::new(
        SyncConfig::default()
            .with_subscriber_capacity(2)
            .with_invariant_checks(true),
    )
    .unwrap();
    let mut lagging = registry.subscribe();

    for i in 0..INSTRUMENTS {
        registry
            .load_snapshot(&instrument(i), &simple_snapshot(1), true)
            .unwrap();
    }

    assert_eq!(lagging.pending(), 2);
    assert_eq!(lagging.dropped(), (INSTRUMENTS - 2) as u64);
    assert_eq!(lagging.try_recv().unwrap().key, instrument(INSTRUMENTS - 2));
}

#[tokio::test]
async fn test_stream_wakes_on_later_change() {
    use futures::StreamExt;

    let registry = Arc::new(strict_registry());
    let mut changes = registry.subscribe();

    let waiter = tokio::spawn(async move { changes.next().await });
    tokio::task::yield_now().await;

    registry
        .update(&btc_usdt(), &update(1, vec![]))
        .unwrap();
    registry
        .load_snapshot(&btc_usdt(), &simple_snapshot(1), true)
        .unwrap();

    let change = timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter timed out")
        .unwrap()
        .expect("stream ended");
    assert_eq!(change.key, btc_usdt());
}
