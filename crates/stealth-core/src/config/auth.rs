//! Identity token configuration.

use serde::{Deserialize, Serialize};

/// Authentication settings for the identity collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Token TTL in hours.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
    /// Whether gateway connections must present a token on upgrade.
    #[serde(default = "default_true")]
    pub require_auth: bool,
    /// Whether `POST /api/users` may create accounts and hand out tokens.
    #[serde(default)]
    pub allow_registration: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl(),
            require_auth: true,
            allow_registration: false,
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_token_ttl() -> i64 {
    24 * 7
}

fn default_true() -> bool {
    true
}
