//! Print per-product statistics of the current event log as JSON
//!
//! Usage:
//!   cargo run --bin product_stats

use dotenv::dotenv;
use env_logger::{Env, Target};
use prodflow::aggregator::Aggregator;
use prodflow::api::product_stats;
use prodflow::config::RuntimeConfig;
use prodflow::store::EventStore;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .target(Target::Stderr)
        .init();

    let config = RuntimeConfig::from_env()?;
    let store = Arc::new(EventStore::new(config.log_path()));
    let stats = product_stats(&Aggregator::new(store))?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
