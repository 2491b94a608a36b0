//! Interceptor CLI - binary entry point.
//!
//! Drives one [`interceptor_browser::Session`] through a single
//! `direct_fetch` navigation and prints the captured handler outcomes. The
//! URL and an optional CSS selector to wait for are read from argv; the
//! browser itself is configured entirely through environment variables, see
//! [`interceptor_browser::SessionConfig`].

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use interceptor_browser::{Session, SessionConfig};
use interceptor_types::{ContentFamily, Execute, Handler, HttpMethod};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    tracing_subscriber::registry().with(env_filter).with(fmt::layer()).init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!("failed to create log dir {}: {e}", parent.display()));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => warnings.push(format!("failed to open log file {}: {e}", candidate.display())),
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".interceptor").join("logs").join("interceptor.log"));
    }
    candidates.push(PathBuf::from(".interceptor").join("logs").join("interceptor.log"));

    candidates
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        bail!("usage: interceptor <url> [wait-selector]");
    };
    let wait_selector = args.next();

    let config = SessionConfig {
        debug: Some(true),
        ..SessionConfig::default()
    };
    let mut session = Session::new(config, None, None).context("failed to build session")?;

    session.new_session(true).await.context("failed to launch browser")?;
    let result = run(&mut session, &url, wait_selector.as_deref()).await;
    session.close(true).await;

    let outcomes = result?;
    for outcome in outcomes {
        match outcome {
            interceptor_types::Outcome::Success(success) => {
                tracing::info!(slug = %success.slug, captured = success.responses.len(), "handler succeeded");
            }
            interceptor_types::Outcome::Failed(failed) => {
                tracing::warn!(slug = %failed.slug, rejected = failed.rejected_responses.len(), "handler found nothing");
            }
        }
    }

    Ok(())
}

async fn run(session: &mut Session, url: &str, wait_selector: Option<&str>) -> Result<Vec<interceptor_types::Outcome>> {
    let page = session.new_page().await.context("failed to open page")?;

    let document = Handler::main(Some("document".to_string()), ContentFamily::Html, HttpMethod::Get, Execute::return_(1));
    let api_calls = Handler::side(Some("api".to_string()), ContentFamily::Json, HttpMethod::Any, None, None, Execute::return_(20));

    let outcomes = page
        .direct_fetch(url, vec![document, api_calls], wait_selector, Duration::from_secs(30))
        .await
        .context("direct_fetch failed")?;

    page.close().await.context("failed to close page")?;
    Ok(outcomes)
}
