//! Persistence store selection.

use serde::{Deserialize, Serialize};

/// Which persistence adapter backs the message log and user records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    /// PostgreSQL via sqlx.
    #[default]
    Postgres,
    /// Process-local memory; lost on restart.
    Memory,
}

/// Persistence store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Selected provider.
    #[serde(default)]
    pub provider: StoreProvider,
}
