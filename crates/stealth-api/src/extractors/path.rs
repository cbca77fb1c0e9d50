//! Typed path parameter helpers.

use stealth_core::result::AppResult;
use stealth_core::types::UserId;

/// Parses a user id from a path segment.
pub fn parse_user_id(raw: &str, field: &str) -> AppResult<UserId> {
    UserId::parse_field(raw, field)
}
