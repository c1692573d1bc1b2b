//! One-shot order scrape
//!
//! Usage:
//!   cargo run --bin fetch_orders -- <code>
//!
//! Prints `{"ok": true, "data": {...}}` or `{"ok": false, "error": "..."}` to
//! stdout. Logs go to stderr.

use dotenv::dotenv;
use env_logger::{Env, Target};
use prodflow::config::RuntimeConfig;
use prodflow::portal::{
    spawn_portal_worker, OrderFetcher, OrderQuery, PortalTimeouts, ReqwestConnector,
    SessionManager,
};
use prodflow::settings::SettingsStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();

    let code = match std::env::args().nth(1) {
        Some(code) if !code.trim().is_empty() => code.trim().to_string(),
        _ => {
            eprintln!("Usage: fetch_orders <code>");
            std::process::exit(2);
        }
    };

    let config = RuntimeConfig::from_env()?;
    let settings = Arc::new(SettingsStore::open(&config.settings_path)?);
    let connector = Arc::new(ReqwestConnector::new(config.http_timeout));
    let session = SessionManager::new(config.portal_url.clone(), connector, settings);
    let fetcher = OrderFetcher::new(
        config.reports_dir(),
        OrderQuery {
            days_back: config.order_window_days_back,
            days_ahead: config.order_window_days_ahead,
            ..OrderQuery::default()
        },
    );
    let timeouts = PortalTimeouts {
        login: config.login_timeout,
        fetch: config.scrape_timeout,
        ..PortalTimeouts::default()
    };

    let (portal, task) = spawn_portal_worker(session, fetcher, 1, timeouts);
    let outcome = portal.scrape(&code).await;
    let _ = portal.close().await;
    drop(portal);
    let _ = task.await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.ok {
        std::process::exit(1);
    }
    Ok(())
}
