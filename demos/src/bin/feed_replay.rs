//! Demo 1: Feed Replay
//!
//! Showcases: Binance diffs arriving before the REST snapshot, buffered
//! replay, Coinbase Pro level2 decoding, change subscriptions
//!
//! Run: cargo run --bin feed_replay

use colored::*;
use depth_sync::{
    BinanceDepthFeed, BookRegistry, BookView, CoinbaseLevel2Feed, FeedDecoder, SyncConfig,
};
use depth_types::{CurrencyPair, Utc, Venue};
use tracing_subscriber::EnvFilter;

const BINANCE_DIFFS: [&str; 3] = [
    r#"{"stream":"btcusdt@depth","data":{"e":"depthUpdate","E":1700000000000,"s":"BTCUSDT","U":990,"u":999,"b":[["43240.00","9.0"]],"a":[]}}"#,
    r#"{"stream":"btcusdt@depth","data":{"e":"depthUpdate","E":1700000000100,"s":"BTCUSDT","U":1000,"u":1003,"b":[["43250.10","0"],["43250.05","0.3"]],"a":[["43250.20","0.6"]]}}"#,
    r#"{"stream":"btcusdt@depth","data":{"e":"depthUpdate","E":1700000000200,"s":"BTCUSDT","U":1004,"u":1006,"b":[],"a":[["43250.15","0.1"],["43252.40","0"]]}}"#,
];

const BINANCE_SNAPSHOT: &str = r#"{"lastUpdateId":1000,"bids":[["43250.10","0.5"],["43250.00","1.25"],["43249.50","2.0"]],"asks":[["43250.20","0.75"],["43251.00","1.0"],["43252.40","3.1"]]}"#;

const COINBASE_FRAMES: [&str; 3] = [
    r#"{"type":"subscriptions","channels":[{"name":"level2","product_ids":["ETH-USD"]}]}"#,
    r#"{"type":"snapshot","product_id":"ETH-USD","bids":[["2250.10","4.5"],["2250.00","10"]],"asks":[["2250.30","3.2"],["2251.00","8"]]}"#,
    r#"{"type":"l2update","product_id":"ETH-USD","time":"2023-11-14T22:13:20.500000Z","changes":[["buy","2250.20","1.5"],["sell","2250.30","0"]]}"#,
];

fn print_book(view: &BookView) {
    println!(
        "  {} {}  last id {}",
        "■".cyan(),
        view.key.to_string().white().bold(),
        view.last_update_id.to_string().yellow()
    );
    for level in view.top_asks(5).iter().rev() {
        println!("      {:>12}  {:>10}", level.price.to_string().red(), level.size);
    }
    println!("      {}", "─".repeat(24).dimmed());
    for level in view.top_bids(5) {
        println!("      {:>12}  {:>10}", level.price.to_string().green(), level.size);
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("{}", "═".repeat(65).cyan());
    println!("{}", "  FEED REPLAY".cyan().bold());
    println!("{}", "  Depth Sync Demo - Snapshot + Diff Reconciliation".cyan());
    println!("{}", "═".repeat(65).cyan());
    println!();

    let registry = BookRegistry::new(SyncConfig::default())?;
    let mut changes = registry.subscribe();

    // Binance: stream first, snapshot later
    let binance = BinanceDepthFeed::new().with_pair(CurrencyPair::new("BTC", "USDT"));
    println!("{}", "  BINANCE: DIFFS BEFORE SNAPSHOT".white().bold());
    println!("  {}", "─".repeat(50));

    for raw in BINANCE_DIFFS {
        for message in binance.decode(raw, Utc::now())? {
            registry.apply(&message)?;
            println!("  {} buffered diff for {}", "●".yellow(), message.key());
        }
    }

    let snapshot = binance.decode_snapshot("BTCUSDT", BINANCE_SNAPSHOT, Utc::now())?;
    registry.apply(&snapshot)?;
    println!("  {} snapshot loaded, buffered diffs replayed", "●".green());
    println!();
    print_book(&registry.get_book(snapshot.key())?);

    // Coinbase Pro: snapshot opens the channel
    let coinbase = CoinbaseLevel2Feed::new();
    println!("{}", "  COINBASE PRO: LEVEL2 CHANNEL".white().bold());
    println!("  {}", "─".repeat(50));

    for raw in COINBASE_FRAMES {
        for message in coinbase.decode(raw, Utc::now())? {
            registry.apply(&message)?;
        }
    }
    for key in registry.keys() {
        if key.venue.as_str() == Venue::COINBASE_PRO {
            print_book(&registry.get_book(&key)?);
        }
    }

    println!("{}", "  CHANGE NOTIFICATIONS".white().bold());
    println!("  {}", "─".repeat(50));
    registry.close();
    while let Some(change) = changes.recv().await {
        println!(
            "  {} {:<28} {:?}  top moved: {}",
            format!("[{}]", change.timestamp.format("%H:%M:%S%.3f")).dimmed(),
            change.key.to_string(),
            change.kind,
            if change.top_of_book_changed { "yes".green() } else { "no".dimmed() }
        );
    }

    Ok(())
}
