//! FraudGuard Journal Watcher - Main Entry Point
//!
//! Watches the journals table for new transaction entries and forwards
//! each complete one to the scoring endpoint.

mod logic;

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::watch;

use logic::config::WatcherSettings;
use logic::delivery::DeliveryClient;
use logic::journal::PgJournalStore;
use logic::watcher::Watcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting FraudGuard Journal Watcher v{}...", env!("CARGO_PKG_VERSION"));

    let settings = WatcherSettings::from_env()?;
    log::info!("   Store: {} (table {})", settings.redacted_database_url(), settings.journal_table);
    log::info!("   Scoring endpoint: {}", settings.delivery.scoring_url);
    log::info!("   Policy: {:?}, poll every {:?}", settings.watcher.policy, settings.watcher.poll_interval);

    let store = PgJournalStore::connect(&settings.database_url, &settings.journal_table)
        .await
        .context("cannot reach journal store")?;
    log::info!("Connected to journal store");

    let client = DeliveryClient::new(settings.delivery.clone())
        .context("cannot build scoring client")?;

    // Endpoint may come up later; the watcher keeps polling either way
    match client.health_check().await {
        Ok(health) => log::info!("Scoring endpoint {}: v{}", health.status, health.version),
        Err(e) => log::warn!("Scoring endpoint not reachable yet: {}", e),
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let watcher = Watcher::new(Arc::new(store), Arc::new(client), settings.watcher.clone());
    let handle = tokio::spawn(watcher.run(stop_rx));

    shutdown_signal().await;

    log::info!("Stop requested, finishing current cycle...");
    let _ = stop_tx.send(true);
    handle.await.context("watcher task failed")?;

    log::info!("Journal watcher exited cleanly");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
