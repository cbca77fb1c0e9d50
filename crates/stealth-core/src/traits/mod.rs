//! Core traits defined in `stealth-core` and implemented by other crates.

pub mod identity;

pub use identity::{IdentityIssuer, IdentityVerifier};
