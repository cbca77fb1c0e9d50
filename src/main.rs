//! Stealth Chat Server
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

use stealth_api::AppState;
use stealth_auth::{JwtDecoder, JwtEncoder};
use stealth_core::config::{AppConfig, StoreProvider};
use stealth_core::error::{AppError, ErrorKind};
use stealth_core::traits::{IdentityIssuer, IdentityVerifier};
use stealth_database::migration::run_migrations;
use stealth_database::store::{MessageStore, UserDirectory};
use stealth_database::{DatabasePool, MemoryStore, MessageRepository, UserRepository};
use stealth_media::{LocalMediaStore, MediaStore};
use stealth_realtime::RealtimeEngine;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay, and env vars
fn load_configuration() -> Result<AppConfig, AppError> {
    let base = std::env::var("STEALTH_CONFIG").unwrap_or_else(|_| "config/default".to_string());
    let env = std::env::var("STEALTH_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&base, &env)
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

/// Persistence adapters for the configured provider.
struct Stores {
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserDirectory>,
    database: Option<DatabasePool>,
}

async fn open_stores(config: &AppConfig) -> Result<Stores, AppError> {
    match config.store.provider {
        StoreProvider::Postgres => {
            let database = DatabasePool::connect(&config.database).await?;
            run_migrations(database.pool()).await?;
            Ok(Stores {
                messages: Arc::new(MessageRepository::new(database.pool().clone())),
                users: Arc::new(UserRepository::new(database.pool().clone())),
                database: Some(database),
            })
        }
        StoreProvider::Memory => {
            tracing::warn!("Using the in-memory store; nothing survives a restart");
            let store = MemoryStore::new();
            Ok(Stores {
                messages: Arc::new(store.clone()),
                users: Arc::new(store),
                database: None,
            })
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        store = ?config.store.provider,
        registration = config.auth.allow_registration,
        "Starting Stealth Chat"
    );

    let stores = open_stores(&config).await?;

    let verifier: Arc<dyn IdentityVerifier> = Arc::new(JwtDecoder::new(&config.auth));
    let issuer: Arc<dyn IdentityIssuer> = Arc::new(JwtEncoder::new(&config.auth));
    let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(&config.media).await?);

    let engine = Arc::new(RealtimeEngine::new(
        config.realtime.clone(),
        stores.messages,
        stores.users,
        verifier.clone(),
        config.auth.require_auth,
    ));
    let background = engine.spawn_background_tasks();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Configuration, format!("Failed to bind {addr}"), e)
    })?;

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(config, engine, verifier, issuer, media);
    stealth_api::app::serve(listener, state, shutdown_signal()).await?;

    for task in background {
        if tokio::time::timeout(grace, task).await.is_err() {
            tracing::warn!("Background task did not stop within the grace period");
        }
    }
    if let Some(database) = stores.database {
        database.close().await;
    }

    tracing::info!("Stealth Chat stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
