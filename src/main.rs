// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: src/main.rs
// Description: Composition root. Loads configuration, wires the repository
//              set, and supervises the outbox publisher and retention
//              sweeper as background tasks. No HTTP surface is started here
//              — the command/query surface (spec §6.1) is a library API
//              consumed by whatever transport adapter a deployment adds.
// ============================================================================

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use olympus_ledger::outbox::{spawn_outbox_publisher, spawn_retention_sweeper, OutboxPublisherConfig};
use olympus_ledger::repo_memory::{InMemoryProductStockRepository, InMemorySerialNumberRepository};
use olympus_ledger::{BulkAllocator, CommandRetryConfig, CommandService, EventIngestService, QueryService};
use olympus_shared::events::{EventBus, EventConfig, RedisEventBus};
use olympus_shared::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let config = AppConfig::load()?;
    config.validate().map_err(|err| format!("invalid configuration: {err}"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(service = %config.monitoring.service_name, env = %config.monitoring.environment, "starting inventory ledger");

    // Repository set. The Postgres-backed implementations (`olympus_ledger::postgres`,
    // behind the `postgres` feature) are the production path; an always-available
    // in-memory set keeps this binary runnable without a database for local use.
    // The in-memory product-stock repository owns the ledger and outbox stores it
    // writes through to on every commit; the publisher/sweeper below poll the
    // same `outbox_repository()` handle so they see the rows the command path
    // actually produces instead of a disconnected store.
    let product_stock_repo = Arc::new(InMemoryProductStockRepository::default());
    let serial_repo = Arc::new(InMemorySerialNumberRepository::default());

    let retry_config = CommandRetryConfig {
        max_attempts: config.command_retry.max_attempts,
        base_delay: std::time::Duration::from_millis(config.command_retry.base_delay_ms),
        max_delay: std::time::Duration::from_millis(config.command_retry.max_delay_ms),
        deadline: std::time::Duration::from_secs(config.server.request_timeout),
    };

    let command_service = Arc::new(CommandService::new(
        product_stock_repo.clone(),
        serial_repo,
        product_stock_repo.outbox_repository(),
        Arc::new(olympus_ledger::NoopCacheInvalidator),
        retry_config,
    ));
    let bulk_allocator = Arc::new(BulkAllocator::new(command_service.clone(), config.bulk_allocation.concurrency));
    let query_service = Arc::new(QueryService::new(
        product_stock_repo.clone(),
        product_stock_repo.ledger_repository(),
        Arc::new(olympus_ledger::NoopCacheInvalidator),
    ));
    let event_ingest = Arc::new(EventIngestService::new(command_service.clone()));

    // Held for the lifetime of the process; a transport adapter (not built
    // here, per spec §1's non-goals) would take ownership of these instead.
    let _held = (bulk_allocator, query_service, event_ingest);

    let event_bus: Arc<dyn EventBus> = match RedisEventBus::connect(EventConfig {
        bus_url: config.event_bus.url.clone(),
        max_retries: config.event_bus.retry_attempts,
        retry_delay: std::time::Duration::from_millis(config.event_bus.retry_delay_ms),
    })
    .await
    {
        Ok(bus) => Arc::new(bus),
        Err(err) => {
            warn!(error = %err, "event bus unavailable at startup");
            return Err(Box::new(err));
        }
    };

    let publisher_config = OutboxPublisherConfig {
        poll_interval: std::time::Duration::from_secs(config.outbox.polling_interval_secs),
        batch_size: config.outbox.batch_size,
        ..OutboxPublisherConfig::default()
    };
    let retention = std::time::Duration::from_secs(config.outbox.retention_days as u64 * 86_400);

    let publisher_handle = spawn_outbox_publisher(product_stock_repo.outbox_repository(), event_bus, publisher_config);
    let sweeper_handle = spawn_retention_sweeper(product_stock_repo.outbox_repository(), retention);

    info!("inventory ledger running; awaiting shutdown signal");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    publisher_handle.abort();
    sweeper_handle.abort();

    Ok(())
}
