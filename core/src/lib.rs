//! Route interceptor core: per-navigation handler dispatch (C6), decoupled
//! from any particular browser driver.

mod error;
mod interceptor;
mod raw;

pub use error::{ErrorDetails, InterceptError, InterceptErrorCode};
pub use interceptor::{ExchangeOutcome, Interceptor};
pub use raw::{FulfillDecision, RawResponse};
