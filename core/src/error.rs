//! Engine-level error type: a stable code, a message, a retryability flag,
//! and a key/value detail bag — never a panic.

use serde::{Serialize, Serializer};

/// Error surfaced by the interceptor's public entry points.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct InterceptError {
    pub code: InterceptErrorCode,
    pub message: String,
    pub retryable: bool,
    pub details: ErrorDetails,
}

impl InterceptError {
    #[must_use]
    pub fn new(code: InterceptErrorCode, message: impl Into<String>) -> Self {
        let retryable = code.default_retryable();
        Self {
            code,
            message: message.into(),
            retryable,
            details: ErrorDetails::default(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.0.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "error": true,
            "code": self.code,
            "message": self.message,
            "retryable": self.retryable,
        });

        if !self.details.0.is_empty() {
            let details: serde_json::Map<String, serde_json::Value> = self
                .details
                .0
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            obj["details"] = serde_json::Value::Object(details);
        }

        obj
    }
}

impl Serialize for InterceptError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// Stable error codes for the interceptor crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptErrorCode {
    /// Duplicate handler slug at `execute()` entry.
    DuplicateSlug,
    /// Handler/Execute construction failed validation.
    Validation,
    /// Driver failed to fetch the body for a routed exchange.
    BodyFetchFailed,
    /// Driver-level transport error (CDP disconnect, browser crash).
    DriverTransport,
    /// Unexpected internal error.
    Internal,
}

impl InterceptErrorCode {
    #[must_use]
    pub fn default_retryable(self) -> bool {
        matches!(self, Self::BodyFetchFailed | Self::DriverTransport | Self::Internal)
    }
}

/// Error details as key-value pairs.
#[derive(Debug, Clone, Default)]
pub struct ErrorDetails(pub Vec<(String, String)>);

impl From<interceptor_types::ValidationError> for InterceptError {
    fn from(err: interceptor_types::ValidationError) -> Self {
        let code = match err {
            interceptor_types::ValidationError::DuplicateSlug(_) => InterceptErrorCode::DuplicateSlug,
            _ => InterceptErrorCode::Validation,
        };
        InterceptError::new(code, err.to_string())
    }
}
