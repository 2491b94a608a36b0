//! Route interceptor (C6): per-navigation handler dispatch, driver-agnostic.
//!
//! The interceptor knows nothing about chromiumoxide or CDP. It is driven by
//! a browser-specific caller one routed exchange at a time: build a
//! [`interceptor_types::Request`], hand it to [`Interceptor::handle_exchange`]
//! along with a network-fetch closure, and forward the returned
//! [`ExchangeOutcome`] back to the driver. That boundary is what lets the
//! quota/ordering/completion logic below be unit tested against a fabricated
//! fetch closure instead of a real page.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex};

use interceptor_types::{
    ExchangeDescriptor, Handler, HandlerSearchFailed, HandlerSearchSuccess, Outcome, Request, Response,
    ValidationError,
};

use crate::error::InterceptError;
use crate::raw::{FulfillDecision, RawResponse};

/// Per-handler counters, reset at [`Interceptor::new`] and updated in place as
/// exchanges arrive.
#[derive(Debug, Default)]
struct HandlerRuntime {
    modifications_used: u32,
    captured: Vec<Response>,
    done: bool,
}

#[derive(Debug, Default)]
struct InterceptorState {
    runtimes: Vec<HandlerRuntime>,
    rejected: Vec<Response>,
    done_count: usize,
}

/// What the caller should do with the routed exchange once
/// [`Interceptor::handle_exchange`] returns.
#[derive(Debug, Clone)]
pub enum ExchangeOutcome {
    /// Fulfill the route with these bytes (possibly modified).
    Fulfill(FulfillDecision),
    /// The network fetch itself failed; let the driver continue the
    /// exchange unmodified rather than attempt to fulfill with nothing.
    PassThrough,
}

/// Per-navigation dispatcher holding handler state keyed by declaration order.
pub struct Interceptor {
    handlers: Vec<Handler>,
    navigation_url: String,
    start_time: Instant,
    state: Mutex<InterceptorState>,
    completion_tx: watch::Sender<bool>,
    completion_rx: watch::Receiver<bool>,
}

impl Interceptor {
    /// # Errors
    ///
    /// Fails if two handlers share a slug.
    pub fn new(handlers: Vec<Handler>, navigation_url: String, start_time: Instant) -> Result<Self, InterceptError> {
        let mut seen = std::collections::HashSet::with_capacity(handlers.len());
        for handler in &handlers {
            if !seen.insert(handler.slug.clone()) {
                return Err(ValidationError::DuplicateSlug(handler.slug.clone()).into());
            }
        }

        let runtimes = handlers.iter().map(|_| HandlerRuntime::default()).collect();
        let (completion_tx, completion_rx) = watch::channel(handlers.is_empty());

        Ok(Self {
            handlers,
            navigation_url,
            start_time,
            state: Mutex::new(InterceptorState {
                runtimes,
                rejected: Vec::new(),
                done_count: 0,
            }),
            completion_tx,
            completion_rx,
        })
    }

    #[must_use]
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Drive one routed exchange through the request-modification,
    /// network-fetch, and response-capture phases (§4.4.1).
    pub async fn handle_exchange<F, Fut>(&self, request: Request, fetch: F) -> ExchangeOutcome
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Result<RawResponse, InterceptError>>,
    {
        let request = self.apply_request_modifiers(request).await;

        let started = Instant::now();
        let raw = match fetch(request.clone()).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, url = %request.real_url(), "network fetch failed");
                let mut state = self.state.lock().await;
                state.rejected.push(Response {
                    status: 0,
                    request_headers: request.headers.clone(),
                    response_headers: Vec::new(),
                    content: Vec::new(),
                    duration: started.elapsed(),
                    url: request.real_url().to_string(),
                });
                return ExchangeOutcome::PassThrough;
            }
        };

        let response = Response {
            status: raw.status,
            request_headers: request.headers.clone(),
            response_headers: raw.headers,
            content: raw.body,
            duration: started.elapsed(),
            url: request.real_url().to_string(),
        };

        let (final_response, any_captured) = self.apply_response_phase(&request, response).await;

        if !any_captured {
            let mut state = self.state.lock().await;
            state.rejected.push(final_response.without_body());
        }

        self.run_quota_bookkeeping().await;

        ExchangeOutcome::Fulfill(FulfillDecision {
            status: final_response.status,
            headers: final_response.response_headers,
            body: final_response.content,
        })
    }

    async fn apply_request_modifiers(&self, mut request: Request) -> Request {
        for (idx, handler) in self.handlers.iter().enumerate() {
            let Some(transformer) = handler.execute.request_modify() else {
                continue;
            };
            if !handler.matches_url_and_method(request.real_url().as_str(), request.method, &self.navigation_url) {
                continue;
            }

            let should_apply = {
                let state = self.state.lock().await;
                let rt = &state.runtimes[idx];
                !rt.done && rt.modifications_used < handler.execute.max_modifications().unwrap_or(0)
            };
            if !should_apply {
                continue;
            }

            let transformed = transformer(request.clone()).await;
            if transformed.method.is_wildcard() {
                tracing::warn!(handler = %handler.slug, "request modifier returned a wildcard method, ignoring");
                continue;
            }
            request = transformed;

            let mut state = self.state.lock().await;
            let rt = &mut state.runtimes[idx];
            if !rt.done && rt.modifications_used < handler.execute.max_modifications().unwrap_or(0) {
                rt.modifications_used += 1;
            }
        }
        request
    }

    /// Runs the response-capture phase (step 3): chains `response_modify`
    /// transformers over a single shared `Response`, appending the
    /// in-progress value to each capturing handler's list as it is reached.
    /// Returns the final chained response and whether any handler captured it.
    async fn apply_response_phase(&self, request: &Request, mut response: Response) -> (Response, bool) {
        let descriptor_method = request.method;
        let mut any_captured = false;

        for (idx, handler) in self.handlers.iter().enumerate() {
            let descriptor = ExchangeDescriptor {
                url: &response.url,
                method: descriptor_method,
                response_headers: &response.response_headers,
            };

            let eligible = {
                let state = self.state.lock().await;
                let rt = &state.runtimes[idx];
                if rt.done || !handler.should_capture(&descriptor, &self.navigation_url) {
                    false
                } else if handler.execute.captures() {
                    let max = handler.execute.max_responses().unwrap_or(u32::MAX) as usize;
                    rt.captured.len() < max
                } else {
                    true
                }
            };
            if !eligible {
                continue;
            }

            if let Some(transformer) = handler.execute.response_modify() {
                let can_modify = {
                    let state = self.state.lock().await;
                    let rt = &state.runtimes[idx];
                    !rt.done && rt.modifications_used < handler.execute.max_modifications().unwrap_or(0)
                };
                if can_modify {
                    response = transformer(response).await;
                    let mut state = self.state.lock().await;
                    let rt = &mut state.runtimes[idx];
                    if !rt.done && rt.modifications_used < handler.execute.max_modifications().unwrap_or(0) {
                        rt.modifications_used += 1;
                    }
                }
            }

            if handler.execute.captures() {
                let mut state = self.state.lock().await;
                let rt = &mut state.runtimes[idx];
                let max = handler.execute.max_responses().unwrap_or(u32::MAX) as usize;
                if !rt.done && rt.captured.len() < max {
                    rt.captured.push(response.clone());
                    any_captured = true;
                }
            }
        }

        (response, any_captured)
    }

    async fn run_quota_bookkeeping(&self) {
        let mut state = self.state.lock().await;
        for (idx, handler) in self.handlers.iter().enumerate() {
            let rt = &mut state.runtimes[idx];
            if rt.done {
                continue;
            }
            if handler
                .execute
                .is_exhausted(rt.captured.len() as u32, rt.modifications_used)
            {
                rt.done = true;
                state.done_count += 1;
            }
        }
        if state.done_count == self.handlers.len() {
            let _ = self.completion_tx.send(true);
        }
    }

    /// Race global completion against a wall-clock timeout (§4.4.2).
    pub async fn wait_for_completion(&self, timeout: Duration) -> Vec<Outcome> {
        let mut rx = self.completion_rx.clone();
        if !*rx.borrow() {
            let sleep = tokio::time::sleep(timeout);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                    () = &mut sleep => break,
                }
            }
        }
        self.build_outcomes().await
    }

    async fn build_outcomes(&self) -> Vec<Outcome> {
        let state = self.state.lock().await;
        self.handlers
            .iter()
            .enumerate()
            .map(|(idx, handler)| {
                let rt = &state.runtimes[idx];
                let duration = self.start_time.elapsed();
                if rt.captured.is_empty() {
                    Outcome::Failed(HandlerSearchFailed {
                        slug: handler.slug.clone(),
                        rejected_responses: state.rejected.clone(),
                        duration,
                    })
                } else {
                    Outcome::Success(HandlerSearchSuccess {
                        slug: handler.slug.clone(),
                        responses: rt.captured.clone(),
                        duration,
                    })
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interceptor_types::{ContentFamily, Execute, HttpMethod};
    use std::sync::Arc;

    fn json_fetch(body: &'static str) -> impl Fn(Request) -> std::future::Ready<Result<RawResponse, InterceptError>> {
        move |_req| {
            std::future::ready(Ok(RawResponse {
                status: 200,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
                body: body.as_bytes().to_vec(),
            }))
        }
    }

    #[tokio::test]
    async fn simple_capture() {
        let handler = Handler::all(
            Some("h1".to_string()),
            ContentFamily::Json,
            HttpMethod::Any,
            None,
            None,
            Execute::return_(1),
        );
        let interceptor = Interceptor::new(vec![handler], "https://x/".to_string(), Instant::now()).unwrap();
        let request = Request::new("https://x/", HttpMethod::Get).unwrap();

        let outcome = interceptor.handle_exchange(request, json_fetch("{\"a\":1}")).await;
        assert!(matches!(outcome, ExchangeOutcome::Fulfill(_)));

        let outcomes = interceptor.wait_for_completion(Duration::from_millis(50)).await;
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            Outcome::Success(s) => assert_eq!(s.responses.len(), 1),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_modifier_adds_param() {
        let modifier: interceptor_types::RequestTransformer = Arc::new(|mut req| {
            Box::pin(async move {
                req.add_param("demo", "true");
                req
            })
        });
        let handler = Handler::all(
            Some("h1".to_string()),
            ContentFamily::Any,
            HttpMethod::Any,
            None,
            None,
            Execute::modify(Some(modifier), None, 1).unwrap(),
        );
        let interceptor = Interceptor::new(vec![handler], "https://x/".to_string(), Instant::now()).unwrap();
        let request = Request::new("https://x/get", HttpMethod::Get).unwrap();

        let seen_param = std::sync::Arc::new(std::sync::Mutex::new(None));
        let seen_param2 = seen_param.clone();
        let fetch = move |req: Request| {
            *seen_param2.lock().unwrap() = req.param("demo").map(str::to_string);
            std::future::ready(Ok(RawResponse {
                status: 200,
                headers: Vec::new(),
                body: Vec::new(),
            }))
        };

        interceptor.handle_exchange(request, fetch).await;
        assert_eq!(*seen_param.lock().unwrap(), Some("true".to_string()));
    }

    #[tokio::test]
    async fn response_modifier_changes_body() {
        let modifier: interceptor_types::ResponseTransformer = Arc::new(|mut resp| {
            Box::pin(async move {
                resp.content = b"{\"_intercepted\":true}".to_vec();
                resp
            })
        });
        let handler = Handler::all(
            Some("h1".to_string()),
            ContentFamily::Any,
            HttpMethod::Any,
            None,
            None,
            Execute::all(None, Some(modifier), 1, 1).unwrap(),
        );
        let interceptor = Interceptor::new(vec![handler], "https://x/".to_string(), Instant::now()).unwrap();
        let request = Request::new("https://x/get", HttpMethod::Get).unwrap();

        let outcome = interceptor.handle_exchange(request, json_fetch("{}")).await;
        match outcome {
            ExchangeOutcome::Fulfill(decision) => {
                assert_eq!(decision.body, b"{\"_intercepted\":true}");
            }
            other => panic!("expected fulfill, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_handlers_compose_headers_in_declaration_order() {
        let h1: interceptor_types::RequestTransformer = Arc::new(|mut req| {
            Box::pin(async move {
                req.add_header("x", "a");
                req
            })
        });
        let h2: interceptor_types::RequestTransformer = Arc::new(|mut req| {
            Box::pin(async move {
                req.add_header("x", "b");
                req
            })
        });
        let handler1 = Handler::all(
            Some("h1".to_string()),
            ContentFamily::Any,
            HttpMethod::Any,
            None,
            None,
            Execute::modify(Some(h1), None, 1).unwrap(),
        );
        let handler2 = Handler::all(
            Some("h2".to_string()),
            ContentFamily::Any,
            HttpMethod::Any,
            None,
            None,
            Execute::modify(Some(h2), None, 1).unwrap(),
        );
        let interceptor =
            Interceptor::new(vec![handler1, handler2], "https://x/".to_string(), Instant::now()).unwrap();
        let request = Request::new("https://x/get", HttpMethod::Get).unwrap();

        let seen_header = Arc::new(std::sync::Mutex::new(None));
        let seen_header2 = seen_header.clone();
        let fetch = move |req: Request| {
            *seen_header2.lock().unwrap() = req.header("x").map(str::to_string);
            std::future::ready(Ok(RawResponse {
                status: 200,
                headers: Vec::new(),
                body: Vec::new(),
            }))
        };

        interceptor.handle_exchange(request, fetch).await;
        assert_eq!(*seen_header.lock().unwrap(), Some("b".to_string()));
    }

    #[tokio::test]
    async fn failure_to_find_reports_rejected() {
        let handler = Handler::all(
            Some("h1".to_string()),
            ContentFamily::Json,
            HttpMethod::Any,
            Some("https://nowhere/".to_string()),
            None,
            Execute::return_(1),
        );
        let interceptor = Interceptor::new(vec![handler], "https://x/".to_string(), Instant::now()).unwrap();
        let request = Request::new("https://x/html", HttpMethod::Get).unwrap();

        interceptor
            .handle_exchange(
                request,
                move |_req| {
                    std::future::ready(Ok(RawResponse {
                        status: 200,
                        headers: vec![("content-type".to_string(), "text/html".to_string())],
                        body: b"<html></html>".to_vec(),
                    }))
                },
            )
            .await;

        let outcomes = interceptor.wait_for_completion(Duration::from_millis(20)).await;
        match &outcomes[0] {
            Outcome::Failed(f) => assert!(!f.rejected_responses.is_empty()),
            other => panic!("expected failed, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_slug_fails_construction() {
        let h1 = Handler::all(
            Some("x".to_string()),
            ContentFamily::Any,
            HttpMethod::Any,
            None,
            None,
            Execute::return_(1),
        );
        let h2 = Handler::all(
            Some("x".to_string()),
            ContentFamily::Any,
            HttpMethod::Any,
            None,
            None,
            Execute::return_(1),
        );
        let err = Interceptor::new(vec![h1, h2], "https://x/".to_string(), Instant::now()).unwrap_err();
        assert_eq!(err.code, crate::error::InterceptErrorCode::DuplicateSlug);
    }
}
