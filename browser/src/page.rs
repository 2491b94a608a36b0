//! Page façade (C7): owns one browser page, exposes `direct_fetch` (route
//! interception over a navigation) and `inject_fetch` (in-page fetch),
//! both preceded by the session-level request modifier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::Page as DriverPage;
use interceptor_core::Interceptor;
use interceptor_types::{Body, Handler, NetworkError, Outcome, Request, RequestTransformer, Response};
use serde_json::Value;

use crate::error::{SessionError, SessionErrorCode};
use crate::route;

const INJECT_FETCH_SCRIPT: &str = include_str!("inject_fetch.js");

/// One live browser page plus the session-level modifier it was created with.
pub struct Page {
    driver: DriverPage,
    request_modifier: Option<RequestTransformer>,
}

impl Page {
    #[must_use]
    pub fn new(driver: DriverPage, request_modifier: Option<RequestTransformer>) -> Self {
        Self { driver, request_modifier }
    }

    /// Applies the session-level request modifier, if any, to `request`.
    /// A modifier result carrying [`HttpMethod::Any`] is discarded with a
    /// warning and the prior request is kept.
    pub async fn modify_request(&self, request: Request) -> Request {
        let Some(modifier) = &self.request_modifier else {
            return request;
        };

        let original = request.clone();
        let modified = modifier(request).await;
        if modified.method.is_wildcard() {
            tracing::warn!("session request modifier returned HttpMethod::Any, discarding");
            return original;
        }
        modified
    }

    /// Navigates to `url` while routing every exchange through `handlers`.
    ///
    /// # Errors
    ///
    /// Fails if handler slugs collide, the Fetch domain cannot be enabled,
    /// or navigation itself errors (a timeout is not an error: it yields
    /// the partial outcome list built from whatever quotas were satisfied
    /// so far).
    pub async fn direct_fetch(
        &self,
        url: &str,
        handlers: Vec<Handler>,
        wait_selector: Option<&str>,
        timeout: Duration,
    ) -> Result<Vec<Outcome>, SessionError> {
        let start_time = Instant::now();
        let interceptor = Arc::new(
            Interceptor::new(handlers, url.to_string(), start_time)
                .map_err(|e| SessionError::new(SessionErrorCode::Internal, e.message))?,
        );

        route::enable(&self.driver)
            .await
            .map_err(|e| SessionError::new(SessionErrorCode::BrowserCrashed, e.message))?;

        let listener = route::spawn_listener(self.driver.clone(), interceptor.clone())
            .await
            .map_err(|e| SessionError::new(SessionErrorCode::BrowserCrashed, e.message))?;

        let result = self.run_navigation(url, wait_selector, timeout, &interceptor).await;

        let _ = route::disable(&self.driver).await;
        listener.abort();

        result
    }

    async fn run_navigation(
        &self,
        url: &str,
        wait_selector: Option<&str>,
        timeout: Duration,
        interceptor: &Interceptor,
    ) -> Result<Vec<Outcome>, SessionError> {
        self.driver
            .evaluate(format!("window.location.href = {url:?};"))
            .await
            .map_err(|e| SessionError::new(SessionErrorCode::BrowserCrashed, format!("navigation failed: {e}")))?;

        if let Some(selector) = wait_selector
            && let Err(err) = self.wait_for_selector(selector, timeout).await
        {
            tracing::warn!(error = %err, selector = %selector, "selector wait timed out, continuing with partial outcomes");
        }

        Ok(interceptor.wait_for_completion(timeout).await)
    }

    /// Polls `selector` via repeated `evaluate` calls, since the CDP crate
    /// exposes no native selector-wait primitive.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), SessionError> {
        let deadline = Instant::now() + timeout;
        let probe = format!("document.querySelector({selector:?}) !== null");

        loop {
            let found = self.driver.evaluate(probe.clone()).await.ok().and_then(|v| v.into_value::<bool>().ok()).unwrap_or(false);
            if found {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::new(SessionErrorCode::Timeout, "timed out waiting for selector").with_detail("selector", selector));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Performs a `fetch` from inside the document context rather than
    /// through the Route interceptor; the companion flow for authenticated
    /// same-origin API calls.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] value (never a driver-level error) if the
    /// in-page script reports failure.
    pub async fn inject_fetch(&self, request: Request) -> Result<Response, NetworkError> {
        let start_time = Instant::now();
        let final_request = self.modify_request(request).await;
        let real_url = final_request.real_url();

        let body_json = final_request
            .body
            .as_ref()
            .map(|body| match body {
                Body::Json(value) => value.clone(),
                Body::Bytes(_) => Value::Null,
            })
            .unwrap_or(Value::Null);

        let headers_json: Value = final_request.headers.iter().cloned().collect::<std::collections::HashMap<_, _>>().into();

        let script = format!(
            "({INJECT_FETCH_SCRIPT})({:?}, {:?}, {}, {})",
            real_url.as_str(),
            final_request.method.as_str(),
            body_json,
            headers_json
        );

        let result: Value = match self.driver.evaluate(script).await {
            Ok(value) => value.into_value().unwrap_or(Value::Null),
            Err(err) => {
                return Err(NetworkError {
                    name: "DriverError".to_string(),
                    message: err.to_string(),
                    details: Vec::new(),
                    timestamp: String::new(),
                    duration: start_time.elapsed(),
                });
            }
        };

        let duration = start_time.elapsed();

        if !result.get("success").and_then(Value::as_bool).unwrap_or(false) {
            let error = result.get("error").cloned().unwrap_or(Value::Null);
            return Err(NetworkError {
                name: error.get("name").and_then(Value::as_str).unwrap_or("Unknown").to_string(),
                message: error.get("message").and_then(Value::as_str).unwrap_or("unknown error").to_string(),
                details: error
                    .get("details")
                    .and_then(Value::as_object)
                    .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.to_string())).collect())
                    .unwrap_or_default(),
                timestamp: error.get("timestamp").and_then(Value::as_str).unwrap_or_default().to_string(),
                duration,
            });
        }

        let response_data = result.get("response").cloned().unwrap_or(Value::Null);
        let response_headers: Vec<(String, String)> = response_data
            .get("headers")
            .and_then(Value::as_object)
            .map(|obj| obj.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect())
            .unwrap_or_default();

        if let Some((_, set_cookie)) = response_headers.iter().find(|(k, _)| k.eq_ignore_ascii_case("set-cookie")) {
            self.apply_set_cookie(real_url.as_str(), set_cookie).await;
        }

        let status = response_data.get("status").and_then(Value::as_u64).unwrap_or(0);
        let content = response_data
            .get("data")
            .map(|v| match v {
                Value::String(s) => s.clone().into_bytes(),
                other => other.to_string().into_bytes(),
            })
            .unwrap_or_default();

        Ok(Response {
            status: u16::try_from(status).unwrap_or(0),
            request_headers: final_request.headers.clone(),
            response_headers,
            content,
            duration,
            url: real_url.to_string(),
        })
    }

    /// Splits a `Set-Cookie` value on commas and pushes each `name=value`
    /// pair into the browser context. This mis-splits cookies whose
    /// `Expires` attribute itself contains a comma; a known, accepted
    /// limitation inherited from the reference behaviour this mirrors.
    async fn apply_set_cookie(&self, url: &str, set_cookie: &str) {
        let Ok(parsed) = url::Url::parse(url) else { return };
        let Some(domain) = parsed.host_str() else { return };

        for cookie_string in set_cookie.split(',') {
            let Some(pair) = cookie_string.split(';').next() else { continue };
            let Some((name, value)) = pair.split_once('=') else { continue };
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() {
                continue;
            }

            let cookie = CookieParam::builder().name(name).value(value).domain(domain).path("/").build();
            match cookie {
                Ok(cookie) => {
                    if let Err(err) = self.driver.set_cookies(vec![cookie]).await {
                        tracing::debug!(error = %err, "failed to set cookie from inject_fetch response");
                    }
                }
                Err(err) => tracing::debug!(error = %err, "could not build cookie param"),
            }
        }
    }

    /// Closes the underlying driver page.
    ///
    /// # Errors
    ///
    /// Fails if the driver rejects the close command.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.driver
            .close()
            .await
            .map_err(|e| SessionError::new(SessionErrorCode::BrowserCrashed, format!("failed to close page: {e}")))
    }
}
