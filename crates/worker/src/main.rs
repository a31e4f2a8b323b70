use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use myteacher_worker::config::WorkerConfig;
use myteacher_worker::dispatcher::GenerationDispatcher;
use myteacher_worker::services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "myteacher_worker=debug,myteacher_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    tracing::info!(
        poll_interval_secs = config.poll_interval.as_secs(),
        max_retries = config.max_retries,
        default_model = %config.default_draw_model,
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = myteacher_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    myteacher_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    myteacher_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let event_bus = Arc::new(myteacher_events::EventBus::default());
    let persistence_handle = tokio::spawn(myteacher_events::NotificationPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
    ));
    tracing::info!("Notification persistence started");

    // --- Pipeline ---
    let orchestrator = services::orchestrator(&config, pool.clone(), Arc::clone(&event_bus)).await?;
    let dispatcher = GenerationDispatcher::new(pool, Arc::new(orchestrator))
        .with_poll_interval(config.poll_interval)
        .with_claim_lease(config.claim_lease);

    let cancel = CancellationToken::new();
    let dispatcher_cancel = cancel.clone();
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_cancel).await;
    });

    shutdown_signal().await;
    tracing::info!("Shutdown requested, finishing the current run");

    cancel.cancel();
    if let Err(e) = dispatcher_handle.await {
        tracing::error!(error = %e, "Dispatcher task ended abnormally");
    }
    tracing::info!("Generation dispatcher stopped");

    // Dropping the last sender closes the channel and ends persistence.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;
    tracing::info!("Graceful shutdown complete");

    Ok(())
}

/// Wait for SIGINT or, on Unix, SIGTERM.
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
