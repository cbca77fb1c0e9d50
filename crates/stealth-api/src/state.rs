//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use stealth_core::config::AppConfig;
use stealth_core::traits::{IdentityIssuer, IdentityVerifier};
use stealth_media::MediaStore;
use stealth_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// WebSocket realtime engine
    pub realtime: Arc<RealtimeEngine>,
    /// Bearer token verification for HTTP endpoints
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Token minting for registration
    pub issuer: Arc<dyn IdentityIssuer>,
    /// Attachment storage
    pub media: Arc<dyn MediaStore>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Assemble the state.
    pub fn new(
        config: AppConfig,
        realtime: Arc<RealtimeEngine>,
        verifier: Arc<dyn IdentityVerifier>,
        issuer: Arc<dyn IdentityIssuer>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            realtime,
            verifier,
            issuer,
            media,
            started_at: Instant::now(),
        }
    }
}
