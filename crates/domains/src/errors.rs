//! # DomainError
//!
//! Centralized error handling for the Classboard ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

use crate::validation::ValidationError;

/// The primary error type for every port and service operation.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Resource not found (e.g., User, Question, Chat)
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// Input rejected by one of the recognizers in [`crate::validation`]
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Request-level validation failure that is not a text rule
    /// (e.g., voting on your own answer, chatting with yourself)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or bad credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but no role grants the action
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The account is banned
    #[error("account banned: {reason}")]
    Banned { reason: String },

    /// Resource already exists (e.g., duplicate username)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded
    #[error("too many requests: {0}")]
    RateLimitExceeded(String),

    /// Infrastructure failure (e.g., DB down, hashing failure)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound(entity, id.to_string())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// A specialized Result type for Classboard logic.
pub type Result<T> = std::result::Result<T, DomainError>;
