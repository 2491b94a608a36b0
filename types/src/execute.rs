//! Execute policy (C5): a tagged variant over {Return, Modify, All}, validated
//! at construction rather than expressed through subclassing.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::ValidationError;
use crate::request::Request;
use crate::response::Response;

pub type RequestTransformer = Arc<dyn Fn(Request) -> BoxFuture<'static, Request> + Send + Sync>;
pub type ResponseTransformer = Arc<dyn Fn(Response) -> BoxFuture<'static, Response> + Send + Sync>;

/// Execution policy carried by a [`crate::handler::Handler`].
#[derive(Clone)]
pub enum Execute {
    /// Capture up to `max_responses` responses verbatim; no transformers.
    Return { max_responses: u32 },
    /// Apply request/response transformers up to `max_modifications` times.
    Modify {
        request_modify: Option<RequestTransformer>,
        response_modify: Option<ResponseTransformer>,
        max_modifications: u32,
    },
    /// Both capture and modify, each with its own quota.
    All {
        request_modify: Option<RequestTransformer>,
        response_modify: Option<ResponseTransformer>,
        max_modifications: u32,
        max_responses: u32,
    },
}

impl std::fmt::Debug for Execute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Execute::Return { max_responses } => {
                f.debug_struct("Return").field("max_responses", max_responses).finish()
            }
            Execute::Modify {
                request_modify,
                response_modify,
                max_modifications,
            } => f
                .debug_struct("Modify")
                .field("request_modify", &request_modify.is_some())
                .field("response_modify", &response_modify.is_some())
                .field("max_modifications", max_modifications)
                .finish(),
            Execute::All {
                request_modify,
                response_modify,
                max_modifications,
                max_responses,
            } => f
                .debug_struct("All")
                .field("request_modify", &request_modify.is_some())
                .field("response_modify", &response_modify.is_some())
                .field("max_modifications", max_modifications)
                .field("max_responses", max_responses)
                .finish(),
        }
    }
}

impl Execute {
    /// `Return` carries no transformers and just caps how many responses are captured.
    #[must_use]
    pub fn return_(max_responses: u32) -> Self {
        Execute::Return { max_responses }
    }

    /// # Errors
    ///
    /// Fails if neither transformer is set, or `max_modifications == 0`.
    pub fn modify(
        request_modify: Option<RequestTransformer>,
        response_modify: Option<ResponseTransformer>,
        max_modifications: u32,
    ) -> Result<Self, ValidationError> {
        if request_modify.is_none() && response_modify.is_none() {
            return Err(ValidationError::MissingTransformer { variant: "Modify" });
        }
        if max_modifications == 0 {
            return Err(ValidationError::MissingModificationQuota { variant: "Modify" });
        }
        Ok(Execute::Modify {
            request_modify,
            response_modify,
            max_modifications,
        })
    }

    /// # Errors
    ///
    /// Fails if neither transformer is set, or either quota is zero.
    pub fn all(
        request_modify: Option<RequestTransformer>,
        response_modify: Option<ResponseTransformer>,
        max_modifications: u32,
        max_responses: u32,
    ) -> Result<Self, ValidationError> {
        if request_modify.is_none() && response_modify.is_none() {
            return Err(ValidationError::MissingTransformer { variant: "All" });
        }
        if max_modifications == 0 {
            return Err(ValidationError::MissingModificationQuota { variant: "All" });
        }
        if max_responses == 0 {
            return Err(ValidationError::MissingResponseQuota);
        }
        Ok(Execute::All {
            request_modify,
            response_modify,
            max_modifications,
            max_responses,
        })
    }

    #[must_use]
    pub fn max_responses(&self) -> Option<u32> {
        match self {
            Execute::Return { max_responses } | Execute::All { max_responses, .. } => {
                Some(*max_responses)
            }
            Execute::Modify { .. } => None,
        }
    }

    #[must_use]
    pub fn max_modifications(&self) -> Option<u32> {
        match self {
            Execute::Return { .. } => None,
            Execute::Modify {
                max_modifications, ..
            }
            | Execute::All {
                max_modifications, ..
            } => Some(*max_modifications),
        }
    }

    #[must_use]
    pub fn request_modify(&self) -> Option<&RequestTransformer> {
        match self {
            Execute::Return { .. } => None,
            Execute::Modify { request_modify, .. } | Execute::All { request_modify, .. } => {
                request_modify.as_ref()
            }
        }
    }

    #[must_use]
    pub fn response_modify(&self) -> Option<&ResponseTransformer> {
        match self {
            Execute::Return { .. } => None,
            Execute::Modify { response_modify, .. } | Execute::All { response_modify, .. } => {
                response_modify.as_ref()
            }
        }
    }

    /// Whether this variant captures responses at all (Return and All do; Modify alone doesn't).
    #[must_use]
    pub fn captures(&self) -> bool {
        matches!(self, Execute::Return { .. } | Execute::All { .. })
    }

    /// Whether a handler carrying this policy has exhausted its quotas given
    /// the current capture count and modification count (C6 §4.4.1 step 5).
    #[must_use]
    pub fn is_exhausted(&self, captured_len: u32, modifications_used: u32) -> bool {
        match self {
            Execute::Return { max_responses } => captured_len >= *max_responses,
            Execute::Modify {
                max_modifications, ..
            } => modifications_used >= *max_modifications,
            Execute::All {
                max_responses,
                max_modifications,
                ..
            } => captured_len >= *max_responses && modifications_used >= *max_modifications,
        }
    }
}
