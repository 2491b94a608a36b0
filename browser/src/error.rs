//! Driver/session-level error type: browser launch failures, CDP disconnects,
//! navigation timeouts, proxy misconfiguration.

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct SessionError {
    pub code: SessionErrorCode,
    pub message: String,
    pub retryable: bool,
    pub details: Vec<(String, String)>,
}

impl SessionError {
    #[must_use]
    pub fn new(code: SessionErrorCode, message: impl Into<String>) -> Self {
        let retryable = code.default_retryable();
        Self {
            code,
            message: message.into(),
            retryable,
            details: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
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
        if !self.details.is_empty() {
            let details: serde_json::Map<String, serde_json::Value> = self
                .details
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            obj["details"] = serde_json::Value::Object(details);
        }
        obj
    }
}

impl Serialize for SessionError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionErrorCode {
    /// Chromium executable not found or not runnable.
    BrowserUnavailable,
    /// Browser process launched but crashed or disconnected.
    BrowserCrashed,
    /// Navigation or selector wait exceeded the configured timeout.
    Timeout,
    /// Proxy string failed to parse.
    InvalidProxy,
    /// A page was required but the session has none, or the page is closed.
    PageUnavailable,
    /// Unexpected internal error.
    Internal,
}

impl SessionErrorCode {
    #[must_use]
    pub fn default_retryable(self) -> bool {
        matches!(self, Self::BrowserCrashed | Self::Timeout | Self::Internal)
    }
}
