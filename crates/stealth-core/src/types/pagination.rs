//! Paging for conversation history.

use serde::{Deserialize, Serialize};

/// Default number of messages in one history page.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
/// Upper bound on a history page.
pub const MAX_HISTORY_LIMIT: u32 = 200;

/// A window over a conversation's messages, counted from the newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Number of messages to return.
    pub limit: u32,
    /// Number of newest messages to skip.
    pub offset: u32,
}

impl HistoryPage {
    /// Build a page, clamping the limit to `1..=MAX_HISTORY_LIMIT`.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit
                .unwrap_or(DEFAULT_HISTORY_LIMIT)
                .clamp(1, MAX_HISTORY_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for HistoryPage {
    fn default() -> Self {
        Self::new(None, None)
    }
}
