//! Live-Chromium integration tests for the browser driver.
//!
//! These tests are skipped unless `INTERCEPTOR_TEST_CHROMIUM_PATH` is set,
//! since they launch a real Chromium process.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use interceptor_browser::{Session, SessionConfig};
use interceptor_types::{ContentFamily, Execute, Handler, HttpMethod, Outcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chromium_path() -> Option<PathBuf> {
    match env::var("INTERCEPTOR_TEST_CHROMIUM_PATH") {
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => {
            eprintln!("INTERCEPTOR_TEST_CHROMIUM_PATH not set; skipping browser test");
            None
        }
    }
}

async fn setup_server(html: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "text/html; charset=utf-8").set_body_string(html))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "application/json").set_body_string(r#"{"items":[1,2,3]}"#))
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn direct_fetch_captures_document_and_side_api_call() {
    let Some(chromium_path) = chromium_path() else { return };

    let html = r#"<html><body><h1 id="loaded">done</h1>
        <script>fetch("/api/items").catch(() => {});</script>
        </body></html>"#;
    let server = setup_server(html).await;

    let config = SessionConfig {
        chromium_path: Some(chromium_path),
        debug: Some(true),
        ..Default::default()
    };
    let mut session = Session::new(config, None, None).expect("valid config");
    session.new_session(true).await.expect("browser launches");

    let page = session.new_page().await.expect("page opens");

    let document = Handler::main(Some("document".to_string()), ContentFamily::Html, HttpMethod::Get, Execute::return_(1));
    let api = Handler::side(
        Some("api".to_string()),
        ContentFamily::Json,
        HttpMethod::Any,
        Some(format!("{}/api/", server.uri())),
        None,
        Execute::return_(1),
    );

    let outcomes = page
        .direct_fetch(&server.uri(), vec![document, api], Some("#loaded"), Duration::from_secs(10))
        .await
        .expect("navigation completes");

    session.close(true).await;

    let document_outcome = outcomes.iter().find(|o| o.slug() == "document").expect("document handler present");
    assert!(document_outcome.is_success(), "document handler should capture the HTML response");

    let api_outcome = outcomes.iter().find(|o| o.slug() == "api").expect("api handler present");
    if let Outcome::Success(success) = api_outcome {
        assert_eq!(success.responses.len(), 1);
    }
}

#[tokio::test]
async fn new_session_rejects_missing_chromium_executable() {
    let config = SessionConfig {
        chromium_path: Some(PathBuf::from("/nonexistent/chromium-binary")),
        ..Default::default()
    };
    let mut session = Session::new(config, None, None).expect("valid config");
    let err = session.new_session(true).await.unwrap_err();
    assert_eq!(err.code, interceptor_browser::SessionErrorCode::BrowserUnavailable);
}
