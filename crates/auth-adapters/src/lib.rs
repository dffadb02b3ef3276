//! # auth-adapters
//!
//! Credential plumbing behind the `domains` auth ports: Argon2 password
//! hashing and signed session tokens.

pub mod password;
#[cfg(feature = "auth-jwt")]
pub mod token;

pub use password::Argon2PasswordHasher;
#[cfg(feature = "auth-jwt")]
pub use token::JwtTokenService;
