//! History query parameters.

use serde::{Deserialize, Serialize};

use stealth_core::types::HistoryPage;

/// `?limit=&offset=` for history endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryParams {
    /// Page size (default 50, clamped to 1..=200).
    pub limit: Option<u32>,
    /// Messages to skip from the newest end.
    pub offset: Option<u32>,
}

impl HistoryParams {
    /// Converts to a clamped `HistoryPage`.
    pub fn into_page(self) -> HistoryPage {
        HistoryPage::new(self.limit, self.offset)
    }
}
