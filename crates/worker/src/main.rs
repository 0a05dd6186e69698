//! Video generation worker.
//!
//! Connects to the database, re-attaches pollers to jobs interrupted by a
//! previous run, then keeps the job tasks alive until SIGINT or SIGTERM.
//!
//! | Variable                   | Default                              |
//! |----------------------------|--------------------------------------|
//! | `DATABASE_URL`             | required                             |
//! | `DATABASE_MAX_CONNECTIONS` | `20`                                 |
//! | `LOG_FORMAT`               | plain text; `json` for JSON lines    |
//! | `RUST_LOG`                 | `vidgen_worker=debug,...`            |
//!
//! Polling and cache variables are read by `PipelineConfig::from_env`.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidgen_pipeline::cache::{FfprobeDurationProbe, LocalArtifactCache};
use vidgen_pipeline::resolver::PgProviderConfigSource;
use vidgen_pipeline::{
    CompletionHandler, PgJobStore, PipelineConfig, ProviderResolver, VideoGenerationService,
};
use vidgen_providers::ProviderRegistry;

const DEFAULT_LOG_FILTER: &str = "vidgen_worker=debug,vidgen_pipeline=debug,vidgen_providers=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // --- Configuration ---
    let config = PipelineConfig::from_env().context("invalid pipeline configuration")?;
    tracing::info!(
        poll_interval_secs = config.poll_interval.as_secs(),
        poll_max_attempts = config.poll_max_attempts,
        default_provider = %config.default_provider,
        cache_enabled = config.cache_enabled,
        "Loaded pipeline configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
        Ok(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("DATABASE_MAX_CONNECTIONS is not a number: {raw}"))?,
        Err(_) => vidgen_db::DEFAULT_MAX_CONNECTIONS,
    };

    let pool = vidgen_db::create_pool(&database_url, max_connections)
        .await
        .context("failed to connect to database")?;
    tracing::info!(max_connections, "Database connection pool created");

    vidgen_db::health_check(&pool)
        .await
        .context("database health check failed")?;
    vidgen_db::run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Pipeline ---
    let registry = ProviderRegistry::with_defaults();
    tracing::info!(providers = ?registry.providers(), "Video providers registered");
    let resolver = ProviderResolver::new(
        Arc::new(PgProviderConfigSource::new(pool.clone())),
        Arc::new(registry),
    );

    let store = Arc::new(PgJobStore::new(pool.clone()));
    let mut completion = CompletionHandler::new(store.clone());
    if config.cache_enabled {
        let cache = LocalArtifactCache::new(config.cache_dir.clone());
        tracing::info!(dir = %cache.root().display(), "Local video cache enabled");
        completion = completion
            .with_cache(Arc::new(cache))
            .with_probe(Arc::new(FfprobeDurationProbe));
    }

    let service = VideoGenerationService::new(store, resolver, completion, &config);

    // --- Recovery ---
    let resumed = service
        .recover_processing_jobs()
        .await
        .context("failed to recover in-flight jobs")?;
    tracing::info!(resumed, "Worker ready");

    shutdown_signal().await;

    // --- Shutdown ---
    service.shutdown().await;
    pool.close().await;
    tracing::info!("Worker stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
