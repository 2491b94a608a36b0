//! Request model (C2): mutable during the modification phase, frozen once
//! dispatched to the network.

use url::Url;

use crate::method::HttpMethod;

/// Request body: raw bytes or a structured value serialisable to bytes.
#[derive(Debug, Clone)]
pub enum Body {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Body {
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Body::Bytes(bytes) => bytes,
            Body::Json(value) => serde_json::to_vec(&value).unwrap_or_default(),
        }
    }
}

/// Mutable HTTP request under construction by request-side transformers.
#[derive(Debug, Clone)]
pub struct Request {
    base_url: Url,
    params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub method: HttpMethod,
}

impl Request {
    /// Construct a Request from a URL string, merging any URL-embedded query
    /// parameters into `params` (explicit `params` passed here wins on collision).
    ///
    /// # Errors
    ///
    /// Returns an error if `url` cannot be parsed.
    pub fn new(url: &str, method: HttpMethod) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(url)?;
        let embedded: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut base_url = parsed;
        base_url.set_query(None);

        Ok(Self {
            base_url,
            params: embedded,
            headers: Vec::new(),
            body: None,
            method,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Recompute base + encoded query on every access; cheap and stable if
    /// `params` is unchanged.
    #[must_use]
    pub fn real_url(&self) -> Url {
        if self.params.is_empty() {
            return self.base_url.clone();
        }
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
        }
        url
    }

    /// Add or overwrite a query parameter; explicit sets win over URL-embedded ones.
    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.params.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.params.push((key, value));
        }
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Add or overwrite a header, matched case-insensitively.
    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            existing.1 = value;
        } else {
            self.headers.push((key, value));
        }
    }

    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}
