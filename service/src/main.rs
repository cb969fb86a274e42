//! Scrip Service - loyalty points and cashback HTTP API.
//!
//! This is the main entry point for the scrip service.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrip_accrual::{run_sweeper, run_worker, AccrualClient, ORDERS_QUEUE_CAPACITY};
use scrip_service::tasks::{run_key_rotator, run_pinger, BACKGROUND_PERIOD};
use scrip_service::{create_router, keys, AppState, Config};
use scrip_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scrip=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting scrip service");

    let config = Config::parse();

    tracing::info!(
        run_address = %config.run_address,
        database_configured = %config.database_dsn().is_some(),
        accrual_configured = %config.accrual_base_url().is_some(),
        "Service configuration loaded"
    );

    // Select the storage backend; a configured database that cannot be
    // opened is startup-fatal.
    let store: Arc<dyn Store> = match config.database_dsn() {
        Some(dsn) => {
            tracing::info!("Opening Postgres store");
            Arc::new(PgStore::connect(dsn).await?)
        }
        None => {
            tracing::info!("No database configured, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    // First hydration: logged but not fatal, the rotator retries.
    if let Err(err) = keys::hydrate_keys(store.as_ref()).await {
        tracing::error!(error = %err, "initial key hydration failed");
    }

    let (orders_tx, orders_rx) = mpsc::channel(ORDERS_QUEUE_CAPACITY);

    tokio::spawn(run_key_rotator(Arc::clone(&store), BACKGROUND_PERIOD));
    tokio::spawn(run_sweeper(
        Arc::clone(&store),
        orders_tx.clone(),
        BACKGROUND_PERIOD,
    ));
    tokio::spawn(run_pinger(Arc::clone(&store), BACKGROUND_PERIOD));

    // The worker runs iff an accrual base URL is configured; without it,
    // orders stay NEW and the queue is simply never drained.
    let _parked_rx = match config.accrual_base_url() {
        Some(base_url) => {
            tracing::info!(accrual_url = %base_url, "Starting accrual worker");
            tokio::spawn(run_worker(
                orders_rx,
                AccrualClient::new(base_url),
                Arc::clone(&store),
            ));
            None
        }
        None => {
            tracing::warn!("Accrual system not configured, orders will not be processed");
            Some(orders_rx)
        }
    };

    let state = AppState::new(store, orders_tx);
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(run_address = %config.run_address, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.run_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
