//! Session/Page lifecycle tests that do not require a live Chromium process.

use std::path::PathBuf;

use interceptor_browser::{BrowserEngine, Session, SessionConfig, SessionErrorCode};

#[tokio::test]
async fn close_without_ever_starting_is_a_noop() {
    let mut session = Session::new(SessionConfig::default(), None, None).unwrap();
    session.close(true).await;
    session.close(true).await;
}

#[tokio::test]
async fn close_without_include_browser_is_a_noop() {
    let mut session = Session::new(SessionConfig::default(), None, None).unwrap();
    session.close(false).await;
}

#[tokio::test]
async fn new_page_before_new_session_fails_with_page_unavailable() {
    let session = Session::new(SessionConfig::default(), None, None).unwrap();
    let err = session.new_page().await.unwrap_err();
    assert_eq!(err.code, SessionErrorCode::PageUnavailable);
}

#[tokio::test]
async fn new_session_without_include_browser_leaves_session_unstarted() {
    let mut session = Session::new(SessionConfig::default(), None, None).unwrap();
    session.new_session(false).await.unwrap();
    let err = session.new_page().await.unwrap_err();
    assert_eq!(err.code, SessionErrorCode::PageUnavailable);
}

#[tokio::test]
async fn non_chromium_engine_is_rejected_before_any_process_is_spawned() {
    let config = SessionConfig {
        engine: Some(BrowserEngine::Firefox),
        ..Default::default()
    };
    let mut session = Session::new(config, None, None).unwrap();
    let err = session.new_session(true).await.unwrap_err();
    assert_eq!(err.code, SessionErrorCode::BrowserUnavailable);
}

#[tokio::test]
async fn invalid_proxy_string_is_rejected_at_construction() {
    let config = SessionConfig {
        proxy: Some("://not a proxy".to_string()),
        trust_env_proxy: Some(false),
        ..Default::default()
    };
    let err = Session::new(config, None, None).unwrap_err();
    assert_eq!(err.code, SessionErrorCode::InvalidProxy);
}

#[tokio::test]
async fn missing_chromium_executable_is_rejected_before_launch() {
    let config = SessionConfig {
        chromium_path: Some(PathBuf::from("/nonexistent/chromium-binary")),
        ..Default::default()
    };
    let mut session = Session::new(config, None, None).unwrap();
    let err = session.new_session(true).await.unwrap_err();
    assert_eq!(err.code, SessionErrorCode::BrowserUnavailable);
}
