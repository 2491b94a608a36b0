//! Domain types for the interception engine: request/response models,
//! content decoding, handler predicates and execution policy, and outcomes.
//!
//! No IO, no async runtime — everything here is pure data and pure functions
//! so it can be unit tested without a browser.

mod content;
mod error;
mod execute;
mod handler;
mod method;
mod outcome;
mod request;
mod response;

pub use content::{content_family, decode, parse_content_type, strip_csrf_prefix, ContentFamily, DecodedContent, ParsedContentType};
pub use error::{NetworkError, ValidationError};
pub use execute::{Execute, RequestTransformer, ResponseTransformer};
pub use handler::{ExchangeDescriptor, Handler, Scope, DEFAULT_MAIN_CONTENT_FAMILIES};
pub use method::HttpMethod;
pub use outcome::{HandlerSearchFailed, HandlerSearchSuccess, Outcome};
pub use request::{Body, Request};
pub use response::Response;
