//! Prodflow runtime
//!
//! Starts the telemetry listener and the portal worker, then waits for CTRL+C.
//!
//! Usage:
//!   cargo run --release --bin prodflow
//!
//! Configuration comes from the environment (see `RuntimeConfig::from_env`),
//! portal credentials from the settings file.

use dotenv::dotenv;
use env_logger::{Env, Target};
use log::{error, info, warn};
use prodflow::aggregator::Aggregator;
use prodflow::api::product_stats;
use prodflow::config::RuntimeConfig;
use prodflow::ingestion::IngestionListener;
use prodflow::portal::{
    spawn_portal_worker, OrderFetcher, OrderQuery, PortalTimeouts, ReqwestConnector,
    SessionManager,
};
use prodflow::settings::SettingsStore;
use prodflow::store::EventStore;
use std::sync::Arc;
use std::time::Duration;

const PORTAL_CHANNEL_BUFFER: usize = 32;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();

    info!("🚀 Prodflow runtime");

    let config = RuntimeConfig::from_env()?;
    std::fs::create_dir_all(config.base_dir())?;
    std::fs::create_dir_all(config.reports_dir())?;

    info!("   ├─ Event log: {}", config.log_path().display());
    info!("   ├─ Reports: {}", config.reports_dir().display());
    info!("   ├─ Settings: {}", config.settings_path.display());
    info!("   ├─ Portal: {}", config.portal_url);
    info!("   └─ Listening on: {}", config.ingest_bind);

    let store = Arc::new(EventStore::new(config.log_path()));
    let settings = Arc::new(SettingsStore::open(&config.settings_path)?);

    // Portal worker
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
    let (portal, portal_task) =
        spawn_portal_worker(session, fetcher, PORTAL_CHANNEL_BUFFER, timeouts);

    match portal.login().await {
        Ok(true) => info!("✅ Portal session ready"),
        Ok(false) => warn!("⚠️  Initial portal login failed, will retry on first scrape"),
        Err(e) => warn!("⚠️  Initial portal login did not complete: {}", e),
    }

    // Ingestion listener
    let listener = IngestionListener::bind(config.ingest_bind.as_str(), store.clone())
        .await
        .map_err(|e| {
            error!("❌ Failed to bind {}: {}", config.ingest_bind, e);
            e
        })?
        .with_max_line_bytes(config.max_line_bytes);
    info!("✅ Listener bound to {}", listener.local_addr()?);
    let listener_task = tokio::spawn(listener.run());

    // Periodic product summary
    let stats_task = if config.stats_interval_secs > 0 {
        let aggregator = Aggregator::new(store.clone());
        let period = Duration::from_secs(config.stats_interval_secs);
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                match product_stats(&aggregator) {
                    Ok(stats) => {
                        info!("📊 {} products in log", stats.len());
                        for (product, aggregate) in &stats {
                            info!(
                                "   ├─ {}: avg total {:.1}s over {} recent records",
                                product,
                                aggregate.average_total_time,
                                aggregate.recent_records.len()
                            );
                        }
                    }
                    Err(e) => error!("❌ Failed to aggregate event log: {}", e),
                }
            }
        }))
    } else {
        None
    };

    info!("🔄 Press CTRL+C to shutdown gracefully");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }

    listener_task.abort();
    if let Some(task) = stats_task {
        task.abort();
    }

    if let Err(e) = portal.close().await {
        warn!("⚠️  Portal session close: {}", e);
    }
    drop(portal);
    let _ = tokio::time::timeout(Duration::from_secs(2), portal_task).await;

    info!("✅ Prodflow runtime stopped");
    Ok(())
}
