//! Per-handler navigation outcome.

use std::time::Duration;

use crate::response::Response;

/// A handler whose predicate matched at least one captured response before
/// its quota or the navigation timeout was reached.
#[derive(Debug, Clone)]
pub struct HandlerSearchSuccess {
    pub slug: String,
    pub responses: Vec<Response>,
    pub duration: Duration,
}

/// A handler that never captured a response; `rejected_responses` holds the
/// (body-omitted outside debug mode) exchanges that were routed to it but
/// didn't satisfy `should_capture`, for diagnostics.
#[derive(Debug, Clone)]
pub struct HandlerSearchFailed {
    pub slug: String,
    pub rejected_responses: Vec<Response>,
    pub duration: Duration,
}

/// Terminal state of a single handler after a navigation completes.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(HandlerSearchSuccess),
    Failed(HandlerSearchFailed),
}

impl Outcome {
    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            Outcome::Success(s) => &s.slug,
            Outcome::Failed(f) => &f.slug,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_accessor_covers_both_variants() {
        let success = Outcome::Success(HandlerSearchSuccess {
            slug: "a".to_string(),
            responses: Vec::new(),
            duration: Duration::from_secs(0),
        });
        let failed = Outcome::Failed(HandlerSearchFailed {
            slug: "b".to_string(),
            rejected_responses: Vec::new(),
            duration: Duration::from_secs(0),
        });
        assert_eq!(success.slug(), "a");
        assert!(success.is_success());
        assert_eq!(failed.slug(), "b");
        assert!(!failed.is_success());
    }
}
