//! Media upload configuration.

use serde::{Deserialize, Serialize};

/// Settings for the local media store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory uploaded files are written to.
    #[serde(default = "default_root")]
    pub root: String,
    /// URL prefix under which stored files are served.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            public_base_url: default_public_base_url(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

fn default_root() -> String {
    "data/media".to_string()
}

fn default_public_base_url() -> String {
    "/media".to_string()
}

fn default_max_upload() -> u64 {
    10 * 1024 * 1024
}
