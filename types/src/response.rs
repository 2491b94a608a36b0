//! Response model (C3): read-only after construction; content is decoded lazily.

use std::time::Duration;

use crate::content::{self, DecodedContent};

/// A captured or rejected HTTP exchange's response side.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub request_headers: Vec<(String, String)>,
    pub response_headers: Vec<(String, String)>,
    pub content: Vec<u8>,
    pub duration: Duration,
    pub url: String,
}

impl Response {
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Decode `content` according to the response's `content-type` header (C1).
    /// Re-runs the decoder on every call; callers that need it repeatedly should cache.
    #[must_use]
    pub fn content_parse(&self) -> DecodedContent {
        let content_type = self.header("content-type").unwrap_or_default();
        content::decode(&self.content, content_type)
    }

    /// Build a body-omitted copy suitable for the rejected-exchange diagnostic
    /// list outside of debug mode.
    #[must_use]
    pub fn without_body(&self) -> Self {
        Self {
            status: self.status,
            request_headers: self.request_headers.clone(),
            response_headers: self.response_headers.clone(),
            content: Vec::new(),
            duration: self.duration,
            url: self.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(content_type: &str, body: &[u8]) -> Response {
        Response {
            status: 200,
            request_headers: Vec::new(),
            response_headers: vec![("content-type".to_string(), content_type.to_string())],
            content: body.to_vec(),
            duration: Duration::from_millis(10),
            url: "https://example.com".to_string(),
        }
    }

    #[test]
    fn decodes_json_body() {
        let resp = sample("application/json", b"{\"a\":1}");
        match resp.content_parse() {
            DecodedContent::Json(v) => assert_eq!(v["a"], 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn without_body_clears_content_but_keeps_metadata() {
        let resp = sample("text/html", b"<html></html>");
        let stripped = resp.without_body();
        assert!(stripped.content.is_empty());
        assert_eq!(stripped.status, 200);
        assert_eq!(stripped.url, resp.url);
    }
}
