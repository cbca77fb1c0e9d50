//! # stealth-auth
//!
//! Identity collaborator for Stealth Chat. Verifies HS256 JWTs whose
//! subject is the caller's [`UserId`](stealth_core::types::UserId) and
//! issues them for seeding and tests.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
