//! Validation errors and the inject-fetch wire error type.

use std::time::Duration;
use thiserror::Error;

/// Construction-time validation failures (handler/execute/API setup).
///
/// These always fail fast, before any navigation or network activity.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("duplicate handler slug: {0}")]
    DuplicateSlug(String),

    #[error("Execute::Return must not carry transformers")]
    ReturnCarriesTransformers,

    #[error("Execute::{variant} requires at least one of request_modify or response_modify")]
    MissingTransformer { variant: &'static str },

    #[error("Execute::{variant} requires max_modifications > 0")]
    MissingModificationQuota { variant: &'static str },

    #[error("Execute::All requires max_responses > 0")]
    MissingResponseQuota,

    #[error("timeout must be positive")]
    TimeoutNotPositive,

    #[error("timeout too large (max {max_seconds} seconds)")]
    TimeoutTooLarge { max_seconds: u64 },
}

/// Error returned by the in-page fetch helper (inject-fetch wire contract).
///
/// Returned as a value, never thrown: `{name, message, details, timestamp, duration}`.
#[derive(Debug, Clone)]
pub struct NetworkError {
    pub name: String,
    pub message: String,
    pub details: Vec<(String, String)>,
    pub timestamp: String,
    pub duration: Duration,
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NetworkError({}: {})", self.name, self.message)
    }
}

impl std::error::Error for NetworkError {}
