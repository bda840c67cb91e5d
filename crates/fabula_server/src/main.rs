//! Fabula generation server.

use fabula_database::{
    PostgresCreditLedger, PostgresGenerationJobRepository, PostgresPricingStore,
    PostgresStoryStore, create_pool,
};
use fabula_error::{ConfigError, FabulaResult};
use fabula_pipeline::{
    BroadcastNotifier, FilesystemStorage, HttpModelDriver, InProcessQueue, JobDispatcher,
    JobWorker, TtlLock, spawn_workers,
};
use fabula_server::{AppState, FabulaConfig, router};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,fabula=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> FabulaResult<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = FabulaConfig::load()?;
    let pool = create_pool(&config.database_url()?)?;

    let jobs = Arc::new(PostgresGenerationJobRepository::new(pool.clone()));
    let ledger = Arc::new(PostgresCreditLedger::new(pool.clone()));
    let stories = Arc::new(PostgresStoryStore::new(pool.clone()));
    let pricing = Arc::new(PostgresPricingStore::new(pool));
    pricing.seed_defaults()?;

    let driver = Arc::new(HttpModelDriver::new(
        &config.model.base_url,
        &config.model.api_key,
        &config.model.standard_model,
        &config.model.premium_model,
        &config.model.image_model,
    ));
    let storage = Arc::new(FilesystemStorage::new(
        &config.media.root,
        &config.media.public_base_url,
    ));
    let lock = Arc::new(TtlLock::new(config.lock_ttl()));
    let notifier = BroadcastNotifier::default();
    let (queue, queue_rx) = InProcessQueue::new(config.queue_capacity);

    let worker = Arc::new(JobWorker::new(
        driver.clone(),
        storage,
        jobs.clone(),
        stories.clone(),
        pricing.clone(),
        lock.clone(),
        Arc::new(notifier.clone()),
    ));
    let handles = spawn_workers(config.worker_count, queue_rx, worker);
    tracing::info!(worker_count = handles.len(), "worker pool running");

    let dispatcher = Arc::new(JobDispatcher::new(
        jobs.clone(),
        ledger,
        stories,
        pricing,
        Arc::new(queue),
        lock,
        driver,
    ));

    let app = router(AppState {
        dispatcher,
        jobs,
        notifier,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| ConfigError::new(format!("failed to bind {}: {e}", config.bind_addr)))?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| ConfigError::new(format!("server error: {e}")).into())
}
