//! CDP Fetch-domain route interception: pairs the Request-stage and
//! Response-stage pauses of a single network exchange and drives them
//! through [`interceptor_core::Interceptor::handle_exchange`].
//!
//! `Fetch.requestPaused` fires twice per exchange when both stages are
//! enabled: once before the request leaves (`response_status_code` and
//! `response_error_reason` both absent) and once after the response
//! headers arrive (both present), correlated by `network_id`. We continue
//! the first pause immediately so the real network round-trip happens,
//! stash the request-stage event, and on the paired response-stage pause
//! fetch the body and hand the whole exchange to the interceptor, which
//! decides how to fulfill it.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, DisableParams, EnableParams, EventRequestPaused, FailRequestParams,
    FulfillRequestParams, GetResponseBodyParams, HeaderEntry, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::ErrorReason;
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use interceptor_core::{ExchangeOutcome, FulfillDecision, InterceptError, InterceptErrorCode, Interceptor, RawResponse};
use interceptor_types::{Body, HttpMethod, Request};

/// Network-id-keyed table of Request-stage pauses waiting for their
/// paired Response-stage pause.
type PendingMap = Mutex<HashMap<String, EventRequestPaused>>;

/// Enables the two-stage `Fetch` domain on `page`: one pattern at the
/// Request stage, one at the Response stage, both matching every URL.
///
/// # Errors
///
/// Fails if the Fetch domain cannot be enabled.
pub async fn enable(page: &Page) -> Result<(), InterceptError> {
    page.execute(EnableParams {
        patterns: Some(vec![
            RequestPattern {
                url_pattern: Some("*".to_string()),
                resource_type: None,
                request_stage: Some(RequestStage::Request),
            },
            RequestPattern {
                url_pattern: Some("*".to_string()),
                resource_type: None,
                request_stage: Some(RequestStage::Response),
            },
        ]),
        handle_auth_requests: Some(false),
    })
    .await
    .map_err(|e| InterceptError::new(InterceptErrorCode::DriverTransport, format!("failed to enable fetch domain: {e}")))?;
    Ok(())
}

/// Disables the `Fetch` domain on `page`, guaranteeing no further
/// `requestPaused` callbacks are delivered.
///
/// # Errors
///
/// Fails if the driver rejects the disable command.
pub async fn disable(page: &Page) -> Result<(), InterceptError> {
    page.execute(DisableParams::default())
        .await
        .map_err(|e| InterceptError::new(InterceptErrorCode::DriverTransport, format!("failed to disable fetch domain: {e}")))?;
    Ok(())
}

/// Subscribes to `Fetch.requestPaused` and spawns a background task that
/// routes every paired exchange through `interceptor`. Call [`disable`]
/// once the caller is done, then abort the returned handle.
///
/// # Errors
///
/// Fails if the event stream cannot be subscribed to.
pub async fn spawn_listener(page: Page, interceptor: Arc<Interceptor>) -> Result<JoinHandle<()>, InterceptError> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| InterceptError::new(InterceptErrorCode::DriverTransport, format!("failed to subscribe to requestPaused: {e}")))?;

    let pending: Arc<PendingMap> = Arc::new(Mutex::new(HashMap::new()));

    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let event = (*event).clone();
            let page = page.clone();
            let interceptor = interceptor.clone();
            let pending = pending.clone();
            tokio::spawn(async move {
                if let Err(err) = route_event(&page, &interceptor, &pending, event).await {
                    tracing::warn!(error = %err, "fetch route handling failed");
                }
            });
        }
    }))
}

async fn route_event(page: &Page, interceptor: &Interceptor, pending: &PendingMap, event: EventRequestPaused) -> Result<(), InterceptError> {
    let is_response_stage = event.response_status_code.is_some() || event.response_error_reason.is_some();

    if !is_response_stage {
        return handle_request_stage(page, pending, event).await;
    }

    handle_response_stage(page, interceptor, pending, event).await
}

/// Continues the request immediately (we never alter wire bytes before the
/// real network round-trip — body/header rewrites happen in the
/// interceptor against the *response*) and stashes the event so the
/// paired Response-stage pause can find it.
async fn handle_request_stage(page: &Page, pending: &PendingMap, event: EventRequestPaused) -> Result<(), InterceptError> {
    continue_unmodified(page, &event.request_id).await;

    let Some(network_id) = event.network_id.clone() else {
        // No network id, so the response stage can never be paired with
        // this request; nothing more to do once it's continued.
        return Ok(());
    };

    pending.lock().await.insert(network_id.inner().clone(), event);
    Ok(())
}

async fn handle_response_stage(
    page: &Page,
    interceptor: &Interceptor,
    pending: &PendingMap,
    response_event: EventRequestPaused,
) -> Result<(), InterceptError> {
    let Some(network_id) = response_event.network_id.clone() else {
        fail(page, &response_event.request_id).await;
        return Ok(());
    };

    let Some(request_event) = pending.lock().await.remove(network_id.inner()) else {
        // A response-stage pause with no matching request stage, most
        // likely a redirect hop we never saw the start of.
        fail(page, &response_event.request_id).await;
        return Ok(());
    };

    if let Some(reason) = response_event.response_error_reason {
        tracing::warn!(reason = ?reason, "network error before response stage");
        fail(page, &response_event.request_id).await;
        return Ok(());
    }

    let request = match build_request(&request_event) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, url = %request_event.request.url, "could not build request from paused event");
            fail(page, &response_event.request_id).await;
            return Ok(());
        }
    };
    let response_request_id = response_event.request_id.clone();

    let outcome = interceptor
        .handle_exchange(request, |_req| fetch_body(page.clone(), response_request_id.clone(), response_event.clone()))
        .await;

    match outcome {
        ExchangeOutcome::Fulfill(decision) => fulfill(page, &response_event.request_id, decision).await,
        ExchangeOutcome::PassThrough => fail(page, &response_event.request_id).await,
    }
    Ok(())
}

async fn continue_unmodified(page: &Page, request_id: &fetch::RequestId) {
    let _ = page
        .execute(ContinueRequestParams {
            request_id: request_id.clone(),
            url: None,
            method: None,
            post_data: None,
            headers: None,
            intercept_response: None,
        })
        .await;
}

async fn fail(page: &Page, request_id: &fetch::RequestId) {
    let _ = page
        .execute(FailRequestParams {
            request_id: request_id.clone(),
            error_reason: ErrorReason::BlockedByClient,
        })
        .await;
}

async fn fetch_body(page: Page, request_id: fetch::RequestId, response_event: EventRequestPaused) -> Result<RawResponse, InterceptError> {
    let status = response_event
        .response_status_code
        .ok_or_else(|| InterceptError::new(InterceptErrorCode::DriverTransport, "response stage missing status code"))?;

    let headers = response_event.response_headers.unwrap_or_default().into_iter().map(|h| (h.name, h.value)).collect();

    let body_response = page
        .execute(GetResponseBodyParams { request_id })
        .await
        .map_err(|e| InterceptError::new(InterceptErrorCode::BodyFetchFailed, format!("failed to fetch response body: {e}")))?;

    let body = if body_response.base64_encoded {
        STANDARD
            .decode(body_response.body.as_bytes())
            .map_err(|e| InterceptError::new(InterceptErrorCode::BodyFetchFailed, format!("response body was not valid base64: {e}")))?
    } else {
        body_response.body.clone().into_bytes()
    };

    Ok(RawResponse {
        status: u16::try_from(status).unwrap_or(0),
        headers,
        body,
    })
}

async fn fulfill(page: &Page, request_id: &fetch::RequestId, decision: FulfillDecision) {
    let mut headers = decision.headers;
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-encoding"));
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-length"));
    headers.push(("Content-Length".to_string(), decision.body.len().to_string()));

    let response_headers = headers.into_iter().map(|(name, value)| HeaderEntry { name, value }).collect::<Vec<_>>();
    let body = STANDARD.encode(&decision.body);

    let _ = page
        .execute(FulfillRequestParams {
            request_id: request_id.clone(),
            response_code: i64::from(decision.status),
            response_headers: Some(response_headers),
            binary_response_headers: None,
            body: Some(body.into()),
            response_phrase: None,
        })
        .await;
}

/// Builds the domain [`Request`] the interceptor reasons over from the
/// raw CDP request payload captured at the Request stage.
fn build_request(event: &EventRequestPaused) -> Result<Request, url::ParseError> {
    let method = HttpMethod::parse(&event.request.method).unwrap_or(HttpMethod::Get);
    let mut request = Request::new(&event.request.url, method)?;

    if let Some(obj) = event.request.headers.inner().as_object() {
        for (key, value) in obj {
            if let Some(value) = value.as_str() {
                request.add_header(key.clone(), value.to_string());
            }
        }
    }

    if let Some(post_data) = &event.request.post_data {
        request.body = Some(Body::Bytes(post_data.clone().into_bytes()));
    }

    Ok(request)
}
