//! Convenience result type alias for Stealth Chat.

use crate::error::AppError;

/// A specialized `Result` type for Stealth Chat operations.
pub type AppResult<T> = Result<T, AppError>;
