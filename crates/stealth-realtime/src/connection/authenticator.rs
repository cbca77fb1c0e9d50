//! WebSocket authentication: resolves the `?token=` credential on upgrade.

use std::sync::Arc;

use stealth_core::error::AppError;
use stealth_core::traits::IdentityVerifier;
use stealth_core::types::UserId;

/// Authenticates WebSocket upgrades through the identity collaborator.
#[derive(Clone)]
pub struct WsAuthenticator {
    verifier: Arc<dyn IdentityVerifier>,
    require_auth: bool,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator")
            .field("require_auth", &self.require_auth)
            .finish()
    }
}

impl WsAuthenticator {
    /// Creates a new WebSocket authenticator.
    pub fn new(verifier: Arc<dyn IdentityVerifier>, require_auth: bool) -> Self {
        Self {
            verifier,
            require_auth,
        }
    }

    /// Resolve the identity for an upgrade.
    ///
    /// `Ok(None)` means the connection starts unauthenticated and must
    /// announce its identity with `join-room`.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Option<UserId>, AppError> {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => self.verifier.verify(token).await.map(Some),
            None if self.require_auth => Err(AppError::authentication(
                "Missing token query parameter",
            )),
            None => Ok(None),
        }
    }
}
