//! Session façade (C8): owns the browser engine + context lifecycle, proxy
//! configuration, a logger, and a factory for pages.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures_util::StreamExt;
use interceptor_types::RequestTransformer;

use crate::chromium::{self, TempProfileDir};
use crate::config::{BrowserEngine, SessionConfig};
use crate::error::{SessionError, SessionErrorCode};
use crate::page::Page;
use crate::resolved::{ProxyPolicy, ResolvedSessionConfig};

/// Runs once, immediately after the browser context is created.
pub type StartFn = Arc<dyn Fn(&Session) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// A browser engine + context, lazily started, idempotently torn down.
pub struct Session {
    config: ResolvedSessionConfig,
    start_fn: Option<StartFn>,
    request_modifier: Option<RequestTransformer>,
    browser: Option<Browser>,
    /// The profile directory is only alive while `browser` is `Some`; kept
    /// here so it outlives the browser process and is removed on drop.
    profile: Option<TempProfileDir>,
}

impl Session {
    #[must_use]
    pub fn new(config: SessionConfig, start_fn: Option<StartFn>, request_modifier: Option<RequestTransformer>) -> Result<Self, SessionError> {
        let resolved = ResolvedSessionConfig::from_config(&config)?;
        Ok(Self {
            config: resolved,
            start_fn,
            request_modifier,
            browser: None,
            profile: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ResolvedSessionConfig {
        &self.config
    }

    /// Launches the browser and opens a context if `include_browser` is
    /// true and no browser is currently running; idempotent otherwise.
    ///
    /// # Errors
    ///
    /// Fails if the configured engine's executable cannot be found or the
    /// browser process cannot be launched.
    pub async fn new_session(&mut self, include_browser: bool) -> Result<(), SessionError> {
        if !include_browser || self.browser.is_some() {
            return Ok(());
        }

        if !matches!(self.config.engine, BrowserEngine::Chromium | BrowserEngine::ChromiumStealth) {
            return Err(SessionError::new(SessionErrorCode::BrowserUnavailable, "only Chromium engines are currently drivable"));
        }

        let chromium_path = chromium::resolve(&self.config.chromium_path)?;
        let profile = TempProfileDir::new()?;

        let mut args = vec!["--no-first-run".to_string(), "--no-default-browser-check".to_string(), format!("--user-agent={}", self.config.user_agent)];
        if matches!(self.config.engine, BrowserEngine::ChromiumStealth) {
            args.push("--disable-blink-features=AutomationControlled".to_string());
        }
        if let ProxyPolicy::Enabled(proxy) = &self.config.proxy {
            args.push(format!("--proxy-server={}", proxy.to_url_string()));
        }

        let mut builder = BrowserConfig::builder().chrome_executable(chromium_path).user_data_dir(&profile.path).viewport(Viewport {
            width: 1280,
            height: 720,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        });
        builder = if self.config.headless { builder.new_headless_mode() } else { builder };
        let browser_cfg = builder
            .args(args)
            .build()
            .map_err(|e| SessionError::new(SessionErrorCode::BrowserUnavailable, format!("failed to configure browser: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_cfg)
            .await
            .map_err(|e| SessionError::new(SessionErrorCode::BrowserUnavailable, format!("failed to launch browser: {e}")))?;

        tokio::spawn(async move { while (handler.next().await).is_some() {} });

        self.browser = Some(browser);
        self.profile = Some(profile);

        if let Some(start_fn) = self.start_fn.clone() {
            start_fn(&*self).await;
        }

        Ok(())
    }

    /// Opens a new page in the shared browser context.
    ///
    /// # Errors
    ///
    /// Fails if no browser has been started yet, or the driver refuses to
    /// open a page.
    pub async fn new_page(&self) -> Result<Page, SessionError> {
        let browser = self.browser.as_ref().ok_or_else(|| SessionError::new(SessionErrorCode::PageUnavailable, "session has no running browser"))?;

        let driver_page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::new(SessionErrorCode::BrowserCrashed, format!("failed to create page: {e}")))?;

        Ok(Page::new(driver_page, self.request_modifier.clone()))
    }

    /// Tears down the browser if `include_browser` is true; idempotent and
    /// tolerant of a session that was never started.
    pub async fn close(&mut self, include_browser: bool) {
        if !include_browser {
            tracing::info!("close() called without include_browser, nothing to do");
            return;
        }

        let Some(mut browser) = self.browser.take() else {
            tracing::warn!("no browser connection to close");
            return;
        };

        if let Err(err) = browser.close().await {
            tracing::error!(error = %err, "error closing browser connection");
        }
        self.profile = None;
    }
}
