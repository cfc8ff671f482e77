use std::sync::Arc;

use actix_web::middleware::from_fn;
use actix_web::{web, App, HttpServer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod domain;
mod http;
mod metrics;
mod store;
mod utils;

use config::AppConfig;
use store::{OrderStore, PgOrderStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,food_delivery=debug")),
        )
        .init();

    tracing::info!("🚀 Starting food delivery order service");

    // === 1. Configuration ===
    let config = AppConfig::from_env()?;

    // === 2. Database pool (waits for Postgres to come up) ===
    tracing::info!(
        host = %config.database.host,
        port = config.database.port,
        attempts = config.database.connect_attempts,
        "Connecting to Postgres..."
    );
    let pg = PgOrderStore::connect(&config.database, config.database.connect_retry()).await?;
    if config.database.apply_schema {
        pg.apply_schema().await?;
    }
    let store: Arc<dyn OrderStore> = Arc::new(pg);

    // === 3. Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!(
        "📊 Metrics registry created with {} metrics",
        metrics.registry().gather().len()
    );
    let metrics_server = metrics::start_metrics_server(
        metrics.registry().clone(),
        config.http_host.clone(),
        config.metrics_port,
    );

    // === 4. Order API ===
    let state = web::Data::new(http::AppState::new(store, metrics));
    tracing::info!(
        "🍽️  Order API listening on http://{}:{}",
        config.http_host,
        config.http_port
    );
    let api_server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(from_fn(http::request_span))
            .configure(http::configure)
    })
    .bind((config.http_host.as_str(), config.http_port))?
    .run();

    tokio::try_join!(api_server, metrics_server)?;

    tracing::info!("Shutdown complete");
    Ok(())
}
