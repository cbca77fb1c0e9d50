//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use stealth_core::config::RealtimeConfig;
use stealth_core::error::AppError;
use stealth_core::traits::IdentityVerifier;
use stealth_database::store::{MessageStore, UserDirectory};

use crate::channel::router::RoomRouter;
use crate::connection::authenticator::WsAuthenticator;
use crate::connection::manager::ConnectionManager;
use crate::connection::pool::ConnectionPool;
use crate::directory::UserService;
use crate::metrics::EngineMetrics;
use crate::pipeline::service::MessagePipeline;
use crate::presence::reaper::PresenceReaper;
use crate::presence::tracker::PresenceTracker;

/// Central real-time engine, constructed once by the process entry point
/// and shared by handle.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager (the gateway dispatcher).
    pub connections: Arc<ConnectionManager>,
    /// Room router.
    pub router: Arc<RoomRouter>,
    /// Presence tracker.
    pub presence: Arc<PresenceTracker>,
    /// Message pipeline.
    pub pipeline: Arc<MessagePipeline>,
    /// User directory.
    pub directory: Arc<UserService>,
    /// Upgrade authenticator.
    pub authenticator: WsAuthenticator,
    /// Metrics collector.
    pub metrics: Arc<EngineMetrics>,
    presence_grace: Duration,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(
        config: RealtimeConfig,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
        verifier: Arc<dyn IdentityVerifier>,
        require_auth: bool,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(EngineMetrics::new());
        let pool = Arc::new(ConnectionPool::new());
        let router = Arc::new(RoomRouter::new(
            pool.clone(),
            metrics.clone(),
            config.max_subscriptions_per_connection,
        ));
        let presence = Arc::new(PresenceTracker::new());
        let pipeline = Arc::new(MessagePipeline::new(
            messages,
            users.clone(),
            router.clone(),
            metrics.clone(),
        ));
        let presence_grace = Duration::from_secs(config.presence_grace_seconds);
        let connections = Arc::new(ConnectionManager::new(
            config,
            pool,
            router.clone(),
            presence.clone(),
            pipeline.clone(),
            metrics.clone(),
        ));
        let directory = Arc::new(UserService::new(users, connections.clone()));

        info!(require_auth, "Real-time engine initialized");

        Self {
            connections,
            router,
            presence,
            pipeline,
            directory,
            authenticator: WsAuthenticator::new(verifier, require_auth),
            metrics,
            presence_grace,
            shutdown_tx,
        }
    }

    /// Starts the presence reaper.
    pub fn spawn_background_tasks(&self) -> Vec<JoinHandle<()>> {
        let reaper = PresenceReaper::new(self.presence.clone(), self.presence_grace);
        vec![reaper.spawn(self.shutdown_receiver())]
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down real-time engine");

        // Signal all tasks to stop
        let _ = self.shutdown_tx.send(());

        self.connections.close_all();

        info!("Real-time engine shut down");
        Ok(())
    }
}
