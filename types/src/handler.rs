//! Handler (C4): declarative predicate + execution policy.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::content::{self, ContentFamily};
use crate::execute::Execute;
use crate::method::HttpMethod;

/// Where a handler watches for exchanges relative to the navigated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The top-level navigation document.
    Main,
    /// Any subresource.
    Side,
    /// Both.
    All,
}

/// Default content families considered part of the "main document" for
/// `Scope::Main` matching. Configurable per Open Question 3 (SPEC_FULL §9).
pub const DEFAULT_MAIN_CONTENT_FAMILIES: &[ContentFamily] =
    &[ContentFamily::Json, ContentFamily::Html, ContentFamily::Image];

static NEXT_SLUG: AtomicU64 = AtomicU64::new(1);

fn auto_slug() -> String {
    format!("handler-{}", NEXT_SLUG.fetch_add(1, Ordering::Relaxed))
}

/// A routed exchange as seen by a handler's predicate: enough data to decide
/// capture without touching the body.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeDescriptor<'a> {
    pub url: &'a str,
    pub method: HttpMethod,
    pub response_headers: &'a [(String, String)],
}

impl ExchangeDescriptor<'_> {
    fn content_family(&self) -> ContentFamily {
        let content_type = self
            .response_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map_or("", |(_, v)| v.as_str());
        content::content_family(&content::parse_content_type(content_type).main_type)
    }
}

/// Immutable declarative unit: predicate + quotas + optional transformers + slug.
#[derive(Debug, Clone)]
pub struct Handler {
    pub slug: String,
    pub scope: Scope,
    pub expected_content: ContentFamily,
    pub method: HttpMethod,
    pub startswith_url: Option<String>,
    pub endswith_url: Option<String>,
    pub execute: Execute,
    pub main_content_families: Vec<ContentFamily>,
}

impl Handler {
    #[must_use]
    pub fn main(slug: Option<String>, expected_content: ContentFamily, method: HttpMethod, execute: Execute) -> Self {
        Self {
            slug: slug.unwrap_or_else(auto_slug),
            scope: Scope::Main,
            expected_content,
            method,
            startswith_url: None,
            endswith_url: None,
            execute,
            main_content_families: DEFAULT_MAIN_CONTENT_FAMILIES.to_vec(),
        }
    }

    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn side(
        slug: Option<String>,
        expected_content: ContentFamily,
        method: HttpMethod,
        startswith_url: Option<String>,
        endswith_url: Option<String>,
        execute: Execute,
    ) -> Self {
        Self {
            slug: slug.unwrap_or_else(auto_slug),
            scope: Scope::Side,
            expected_content,
            method,
            startswith_url,
            endswith_url,
            execute,
            main_content_families: DEFAULT_MAIN_CONTENT_FAMILIES.to_vec(),
        }
    }

    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn all(
        slug: Option<String>,
        expected_content: ContentFamily,
        method: HttpMethod,
        startswith_url: Option<String>,
        endswith_url: Option<String>,
        execute: Execute,
    ) -> Self {
        Self {
            slug: slug.unwrap_or_else(auto_slug),
            scope: Scope::All,
            expected_content,
            method,
            startswith_url,
            endswith_url,
            execute,
            main_content_families: DEFAULT_MAIN_CONTENT_FAMILIES.to_vec(),
        }
    }

    /// Override the configurable "main content family" set used by `Scope::Main`.
    #[must_use]
    pub fn with_main_content_families(mut self, families: Vec<ContentFamily>) -> Self {
        self.main_content_families = families;
        self
    }

    /// URL/method/scope portion of the predicate — everything decidable
    /// before a response exists. Used both by `should_capture` and by the
    /// request-modification phase, which has no response data to test against.
    #[must_use]
    pub fn matches_url_and_method(&self, url: &str, method: HttpMethod, navigation_url: &str) -> bool {
        if !self.method.is_wildcard() && method != self.method {
            return false;
        }

        match self.scope {
            Scope::Main => {
                let is_navigation_document = url == navigation_url || url.starts_with(navigation_url);
                if !is_navigation_document {
                    return false;
                }
            }
            Scope::Side => {
                if url == navigation_url {
                    return false;
                }
            }
            Scope::All => {}
        }

        if let Some(prefix) = &self.startswith_url
            && !url.starts_with(prefix.as_str())
        {
            return false;
        }
        if let Some(suffix) = &self.endswith_url
            && !url.ends_with(suffix.as_str())
        {
            return false;
        }

        true
    }

    /// Pure predicate over a routed exchange descriptor (C4 §4.3).
    #[must_use]
    pub fn should_capture(&self, exchange: &ExchangeDescriptor<'_>, navigation_url: &str) -> bool {
        if !self.matches_url_and_method(exchange.url, exchange.method, navigation_url) {
            return false;
        }

        let family = exchange.content_family();
        if matches!(self.scope, Scope::Main)
            && !self
                .main_content_families
                .iter()
                .any(|f| families_equal(*f, family))
        {
            return false;
        }

        matches!(self.expected_content, ContentFamily::Any) || families_equal(self.expected_content, family)
    }
}

fn families_equal(a: ContentFamily, b: ContentFamily) -> bool {
    std::mem::discriminant(&a) == std::mem::discriminant(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor<'a>(url: &'a str, content_type: &'a [(String, String)]) -> ExchangeDescriptor<'a> {
        ExchangeDescriptor {
            url,
            method: HttpMethod::Get,
            response_headers: content_type,
        }
    }

    #[test]
    fn main_scope_requires_navigation_document_and_allowed_family() {
        let handler = Handler::main(None, ContentFamily::Any, HttpMethod::Any, Execute::return_(1));
        let headers = vec![("content-type".to_string(), "application/json".to_string())];
        let exchange = descriptor("https://x/", &headers);
        assert!(handler.should_capture(&exchange, "https://x/"));

        let other = descriptor("https://y/other", &headers);
        assert!(!handler.should_capture(&other, "https://x/"));
    }

    #[test]
    fn side_scope_excludes_navigation_document() {
        let handler = Handler::side(None, ContentFamily::Any, HttpMethod::Any, None, None, Execute::return_(1));
        let headers = vec![];
        let nav = descriptor("https://x/", &headers);
        assert!(!handler.should_capture(&nav, "https://x/"));

        let sub = descriptor("https://x/api", &headers);
        assert!(handler.should_capture(&sub, "https://x/"));
    }

    #[test]
    fn startswith_and_endswith_filters_apply() {
        let handler = Handler::all(
            None,
            ContentFamily::Any,
            HttpMethod::Any,
            Some("https://x/api".to_string()),
            Some(".json".to_string()),
            Execute::return_(1),
        );
        let headers = vec![];
        assert!(handler.should_capture(&descriptor("https://x/api/a.json", &headers), "https://x/"));
        assert!(!handler.should_capture(&descriptor("https://x/other/a.json", &headers), "https://x/"));
        assert!(!handler.should_capture(&descriptor("https://x/api/a.xml", &headers), "https://x/"));
    }

    #[test]
    fn auto_slug_is_unique() {
        let a = Handler::all(None, ContentFamily::Any, HttpMethod::Any, None, None, Execute::return_(1));
        let b = Handler::all(None, ContentFamily::Any, HttpMethod::Any, None, None, Execute::return_(1));
        assert_ne!(a.slug, b.slug);
    }
}
