//! dashquery API Server
//!
//! Run with: cargo run --bin dashquery-api
//!
//! # Configuration
//!
//! Settings come from the first config file found in
//! `~/.config/dashquery/config.toml`, `/etc/dashquery/config.toml` or
//! `./config.toml`, with `DASHQUERY_*` environment overrides on top.
//! `RUST_LOG` overrides the configured log level.

use dashquery::api::{serve, AppState};
use dashquery::config::{Config, LoggingConfig};
use dashquery::engine::FieldCatalog;
use dashquery::query::{QueryExecutor, TableSettings};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    init_tracing(&config.logging);

    tracing::info!("Starting dashquery API server v{}", env!("CARGO_PKG_VERSION"));

    let context = config.query_context()?;
    tracing::info!(
        timezone = %context.time.timezone,
        utc_offset = %context.time.utc_offset,
        composite_sources = context.composite_sources,
        "Query settings loaded"
    );

    let router = Arc::new(config.engine.router()?);
    tracing::info!("Engine routes: {:?}", router);

    let executor = Arc::new(
        QueryExecutor::new(Arc::clone(&router), context)
            .with_tables(TableSettings::from(&config.tables)),
    );

    let catalog = Arc::new(
        FieldCatalog::new(
            router,
            config.fields.index_patterns.clone(),
            config.fields.cache_ttl(),
        )
        .with_value_limit(config.fields.value_limit),
    );

    // Warm the field cache; failures are logged per pattern and retried on access
    catalog.refresh_if_stale().await;

    let state = AppState::new(executor, catalog, config.api.clone());
    serve(state).await?;

    tracing::info!("dashquery API server stopped");
    Ok(())
}

/// Install the global subscriber, pretty or JSON per `logging.format`
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("dashquery={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
