//! Identity collaborator seam.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::UserId;

/// Turns a client-supplied credential into the caller's identity.
///
/// The realtime gateway and the HTTP layer only depend on this trait; the
/// token format lives in `stealth-auth`.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + std::fmt::Debug + 'static {
    /// Verify `credential` and return the identity it binds.
    ///
    /// Fails with an authentication error when the credential is malformed,
    /// forged, or expired.
    async fn verify(&self, credential: &str) -> AppResult<UserId>;
}

/// Mints credentials that an [`IdentityVerifier`] will later accept.
pub trait IdentityIssuer: Send + Sync + std::fmt::Debug + 'static {
    /// Issue a credential binding `user`.
    fn issue(&self, user: UserId) -> AppResult<String>;
}
