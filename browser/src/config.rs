//! Raw, boundary-level session configuration: `Option`-heavy, deserialisable,
//! with accessor methods applying defaults. Resolved once via
//! [`crate::resolved::ResolvedSessionConfig::from_config`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which browser engine a session should drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowserEngine {
    #[default]
    Chromium,
    /// Chromium launched with stealth-oriented flags (disabled automation
    /// banner, spoofed navigator properties); same CDP surface as `Chromium`.
    ChromiumStealth,
    Firefox,
    WebKit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub engine: Option<BrowserEngine>,
    pub headless: Option<bool>,
    pub chromium_path: Option<PathBuf>,
    pub timeout_seconds: Option<u32>,
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
    pub trust_env_proxy: Option<bool>,
    pub debug: Option<bool>,
}

impl SessionConfig {
    pub(crate) const DEFAULT_TIMEOUT_SECONDS: u32 = 30;
    pub(crate) const MAX_TIMEOUT_SECONDS: u32 = 3600;

    #[must_use]
    pub fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds.unwrap_or(Self::DEFAULT_TIMEOUT_SECONDS)
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless.unwrap_or(!self.debug.unwrap_or(false))
    }

    #[must_use]
    pub fn trust_env_proxy(&self) -> bool {
        self.trust_env_proxy.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_headless_and_thirty_second_timeout() {
        let config = SessionConfig::default();
        assert!(config.headless());
        assert_eq!(config.timeout_seconds(), 30);
    }

    #[test]
    fn debug_flips_headless_default() {
        let config = SessionConfig {
            debug: Some(true),
            ..Default::default()
        };
        assert!(!config.headless());
    }
}
