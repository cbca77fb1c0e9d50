//! # stealth-core
//!
//! Core crate for Stealth Chat. Contains configuration schemas, typed
//! identifiers, history paging types, the identity collaborator trait,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Stealth Chat crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
