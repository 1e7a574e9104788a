mod config;
mod metrics;
mod routes;
mod store;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{AppConfig, LogFormat, LoggingConfig};
use extract::ClaimExtractor;
use ingest::PlainTextEngine;
use metrics::Metrics;
use query::AnswerMatcher;
use routes::AppState;
use store::ClaimStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();
    init_tracing(&config.logging)?;

    tracing::info!(
        extraction_fallback = config.fallback.extraction,
        qa_fallback = config.fallback.qa,
        trigger = ?config.fallback.trigger,
        persist = config.storage.persist,
        "Starting claim service"
    );

    let state = Arc::new(AppState {
        fallback: config.fallback,
        persist: config.storage.persist,
        extractor: ClaimExtractor::default(),
        matcher: AnswerMatcher::default(),
        ocr: Box::new(PlainTextEngine),
        store: ClaimStore::open(&config.storage.path),
        metrics: Metrics::new(),
    });

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .context(format!("Failed to bind {}", config.server.bind_addr))?;

    tracing::info!("Server listening on http://{}", config.server.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
    .context("Failed to initialise tracing")
}
