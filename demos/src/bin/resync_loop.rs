//! Demo 2: Resync Loop
//!
//! Showcases: Duplicate detection, invalidate + resnapshot, pending buffer
//! overflow, stale-feed detection, per-book statistics
//!
//! Run: cargo run --bin resync_loop

use chrono::Duration;
use colored::*;
use depth_sync::{BookError, BookRegistry, SyncConfig};
use depth_types::{
    BookSnapshot, BookUpdate, CurrencyPair, InstrumentKey, LevelChange, PriceLevel, Utc,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Simulated venue: snapshot on demand, diffs with occasional retries
struct SyntheticVenue {
    key: InstrumentKey,
    sequence: u64,
    mid: i64,
}

impl SyntheticVenue {
    fn new(base: &str) -> Self {
        Self {
            key: InstrumentKey::spot("binance", CurrencyPair::new(base, "USDT")),
            sequence: 100,
            mid: 1_000,
        }
    }

    fn snapshot(&self) -> BookSnapshot {
        let bids = (1..=10)
            .map(|i| PriceLevel::new(Decimal::from(self.mid - i), Decimal::from(i)))
            .collect();
        let asks = (1..=10)
            .map(|i| PriceLevel::new(Decimal::from(self.mid + i), Decimal::from(i)))
            .collect();
        BookSnapshot::new(bids, asks, self.sequence, Utc::now())
    }

    fn next_update(&mut self, step: u64) -> BookUpdate {
        self.sequence += 1;
        self.mid += if step % 3 == 0 { 1 } else { -1 };
        let changes = vec![
            LevelChange::bid(Decimal::from(self.mid - 1), Decimal::from(step % 5)),
            LevelChange::ask(Decimal::from(self.mid + 1), Decimal::from(step % 4 + 1)),
        ];
        BookUpdate::new(self.sequence, changes, Utc::now())
    }
}

fn ingest(registry: &BookRegistry, venue: &mut SyntheticVenue, steps: u64) -> u64 {
    let mut resyncs = 0;

    for step in 0..steps {
        // Replay the last message now and then, as a retrying transport would
        let update = if step % 41 == 40 {
            let mut duplicate = venue.next_update(step);
            duplicate.update_id -= 1;
            duplicate
        } else {
            venue.next_update(step)
        };

        match registry.update(&venue.key, &update) {
            Ok(_) => {}
            Err(err) if err.requires_resync() => {
                warn!(instrument = %venue.key, error = %err, "Resyncing");
                registry.invalidate(&venue.key);
                if let Err(err) = registry.load_snapshot(&venue.key, &venue.snapshot(), true) {
                    warn!(error = %err, "Resnapshot failed");
                }
                resyncs += 1;
            }
            Err(err) => warn!(error = %err, "Update dropped"),
        }
    }

    resyncs
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("{}", "═".repeat(65).cyan());
    println!("{}", "  RESYNC LOOP".cyan().bold());
    println!("{}", "  Depth Sync Demo - Sequence Violations and Recovery".cyan());
    println!("{}", "═".repeat(65).cyan());
    println!();

    let registry = Arc::new(BookRegistry::new(
        SyncConfig::default().with_buffer_capacity(16).with_max_depth(25),
    )?);

    println!("{}", "  PENDING BUFFER OVERFLOW".white().bold());
    println!("  {}", "─".repeat(50));
    let mut slow = SyntheticVenue::new("DOGE");
    let early = slow.snapshot();
    for step in 0..20 {
        let update = slow.next_update(step);
        if let Err(BookError::BufferOverflow { evicted_through, .. }) =
            registry.update(&slow.key, &update)
        {
            println!(
                "  {} buffer full, history lost through id {}",
                "●".red(),
                evicted_through.to_string().yellow()
            );
            break;
        }
    }
    match registry.load_snapshot(&slow.key, &early, true) {
        Err(err) => println!("  {} early snapshot refused: {}", "●".red(), err),
        Ok(_) => println!("  {} early snapshot applied", "●".green()),
    }
    registry.load_snapshot(&slow.key, &slow.snapshot(), true)?;
    println!("  {} fresh snapshot applied, book {:?}", "●".green(), registry.state(&slow.key));
    println!();

    println!("{}", "  CONCURRENT FEEDS WITH RETRIED MESSAGES".white().bold());
    println!("  {}", "─".repeat(50));

    let mut tasks = Vec::new();
    for base in ["BTC", "ETH", "SOL", "XRP"] {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::task::spawn_blocking(move || {
            let mut venue = SyntheticVenue::new(base);
            registry.load_snapshot(&venue.key, &venue.snapshot(), true)?;
            let resyncs = ingest(&registry, &mut venue, 2_000);
            Ok::<_, BookError>((venue.key, resyncs))
        }));
    }

    for task in tasks {
        let (key, resyncs) = task.await??;
        let stats = registry.stats(&key).unwrap_or_default();
        let view = registry.get_book(&key)?;
        info!(instrument = %key, resyncs, "Feed finished");
        println!(
            "  {:<24} resyncs {:>3}  applied {:>5}  rejected {:>3}  best {} / {}",
            key.to_string().white(),
            resyncs.to_string().yellow(),
            stats.updates_applied,
            stats.updates_rejected.to_string().red(),
            view.best_bid().map(|l| l.price.to_string()).unwrap_or_default().green(),
            view.best_ask().map(|l| l.price.to_string()).unwrap_or_default().red(),
        );
    }
    println!();

    println!("{}", "  STALE FEED CHECK".white().bold());
    println!("  {}", "─".repeat(50));
    let later = Utc::now() + Duration::seconds(90);
    for key in registry.stale_instruments(later, Duration::seconds(60)) {
        println!("  {} {} silent for over 60s, would invalidate", "●".yellow(), key);
    }

    Ok(())
}
