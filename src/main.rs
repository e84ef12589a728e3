//! Parley Server: real-time presence and direct-message delivery.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use parley_core::config::AppConfig;
use parley_core::error::AppError;
use parley_core::traits::{MessageBus, PresenceDirectory};
use parley_database::store::{MessageStore, UserStore};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/default.toml`, the environment overlay
/// and `PARLEY__*` variables.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("PARLEY_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db_pool = parley_database::DatabasePool::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    parley_database::migration::run_migrations(db_pool.pool()).await?;
    tracing::info!("Database migrations complete");

    let users: Arc<dyn UserStore> = Arc::new(parley_database::repositories::UserRepository::new(
        db_pool.pool().clone(),
    ));
    let messages: Arc<dyn MessageStore> = Arc::new(
        parley_database::repositories::MessageRepository::new(db_pool.pool().clone()),
    );

    // ── Step 2: Presence directory ───────────────────────────────
    tracing::info!(
        "Initializing presence directory (provider: {})...",
        config.directory.provider
    );
    let directory: Arc<dyn PresenceDirectory> =
        Arc::new(parley_directory::provider::DirectoryManager::new(&config.directory).await?);

    // ── Step 3: Pub/sub bus ──────────────────────────────────────
    tracing::info!("Initializing bus (provider: {})...", config.bus.provider);
    let bus: Arc<dyn MessageBus> =
        Arc::new(parley_realtime::bridge::BusManager::new(&config.bus).await?);

    // ── Step 4: Real-time engine ─────────────────────────────────
    let engine = parley_realtime::RealtimeEngine::new(
        &config,
        parley_realtime::EngineDependencies {
            users: Arc::clone(&users),
            messages: Arc::clone(&messages),
            directory,
            bus,
        },
    );
    let subscriber_handle = engine.start().await?;
    tracing::info!(instance_id = %engine.instance_id, "Real-time engine started");

    // ── Step 5: Build and start HTTP server ──────────────────────
    let app_state = parley_api::AppState {
        config: Arc::new(config.clone()),
        realtime: engine.clone(),
        users,
        messages,
        database: Arc::new(db_pool.clone()),
    };

    let app = parley_api::build_router(app_state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Parley server listening on {}", addr);

    // ── Step 6: Graceful shutdown ────────────────────────────────
    let shutdown_engine = engine.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        shutdown_engine.shutdown();
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    tracing::info!("Waiting for background tasks to complete...");
    let _ = tokio::time::timeout(Duration::from_secs(10), subscriber_handle).await;
    db_pool.close().await;

    tracing::info!("Parley server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
