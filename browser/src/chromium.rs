//! Chromium executable discovery and isolated profile directories.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{SessionError, SessionErrorCode};
use crate::resolved::ChromiumLocation;

/// Resolve a chromium executable per `location`, searching `PATH` and
/// well-known install locations when `location` is `SearchPath`.
///
/// # Errors
///
/// Fails if no usable chromium binary can be found.
pub fn resolve(location: &ChromiumLocation) -> Result<PathBuf, SessionError> {
    match location {
        ChromiumLocation::Explicit(path) => {
            if path.exists() {
                Ok(path.clone())
            } else {
                Err(SessionError::new(SessionErrorCode::BrowserUnavailable, "chromium executable not found")
                    .with_detail("path", path.display().to_string()))
            }
        }
        ChromiumLocation::SearchPath => find_chromium()
            .ok_or_else(|| SessionError::new(SessionErrorCode::BrowserUnavailable, "chromium executable not found")),
    }
}

fn find_chromium() -> Option<PathBuf> {
    if let Some(path) = find_on_path(&chromium_candidates()) {
        return Some(path);
    }
    platform_chromium_paths().into_iter().find(|path| path.exists())
}

fn find_on_path(candidates: &[&str]) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        for candidate in candidates {
            let full = dir.join(candidate);
            if full.exists() {
                return Some(full);
            }
        }
    }
    None
}

#[cfg(target_os = "windows")]
fn chromium_candidates() -> Vec<&'static str> {
    vec!["chromium.exe", "chrome.exe"]
}

#[cfg(target_os = "macos")]
fn chromium_candidates() -> Vec<&'static str> {
    vec!["chromium", "google-chrome", "chrome"]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn chromium_candidates() -> Vec<&'static str> {
    vec!["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"]
}

#[cfg(target_os = "windows")]
fn platform_chromium_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(base) = std::env::var_os("ProgramFiles") {
        let base = PathBuf::from(base);
        paths.push(base.join("Google/Chrome/Application/chrome.exe"));
        paths.push(base.join("Chromium/Application/chrome.exe"));
    }
    if let Some(base) = std::env::var_os("ProgramFiles(x86)") {
        let base = PathBuf::from(base);
        paths.push(base.join("Google/Chrome/Application/chrome.exe"));
        paths.push(base.join("Chromium/Application/chrome.exe"));
    }
    if let Some(base) = std::env::var_os("LOCALAPPDATA") {
        paths.push(PathBuf::from(base).join("Chromium/Application/chrome.exe"));
    }
    paths
}

#[cfg(target_os = "macos")]
fn platform_chromium_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
        PathBuf::from("/usr/local/bin/chromium"),
        PathBuf::from("/opt/homebrew/bin/chromium"),
    ]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_chromium_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/bin/chromium"),
        PathBuf::from("/usr/bin/chromium-browser"),
        PathBuf::from("/usr/bin/google-chrome"),
        PathBuf::from("/usr/bin/google-chrome-stable"),
        PathBuf::from("/snap/bin/chromium"),
    ]
}

/// An isolated, temporary `--user-data-dir`, removed on drop.
pub struct TempProfileDir {
    pub path: PathBuf,
}

impl TempProfileDir {
    /// # Errors
    ///
    /// Fails if no writable temporary directory could be created after
    /// several attempts.
    pub fn new() -> Result<Self, SessionError> {
        let base = std::env::temp_dir();
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let pid = std::process::id();

        for attempt in 0..10 {
            let mut path = base.clone();
            path.push(format!("interceptor-browser-{pid}-{timestamp}-{attempt}"));
            if fs::create_dir_all(&path).is_ok() {
                return Ok(Self { path });
            }
        }

        Err(SessionError::new(
            SessionErrorCode::Internal,
            "failed to create temporary browser profile directory",
        ))
    }
}

impl Drop for TempProfileDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_path_is_rejected() {
        let location = ChromiumLocation::Explicit(PathBuf::from("/nonexistent/chromium-binary"));
        let err = resolve(&location).unwrap_err();
        assert_eq!(err.code, SessionErrorCode::BrowserUnavailable);
    }

    #[test]
    fn explicit_existing_path_is_accepted() {
        let existing = std::env::current_exe().expect("test binary path exists");
        let location = ChromiumLocation::Explicit(existing.clone());
        assert_eq!(resolve(&location).unwrap(), existing);
    }

    #[test]
    fn temp_profile_dir_is_created_and_removed_on_drop() {
        let profile = TempProfileDir::new().unwrap();
        let path = profile.path.clone();
        assert!(path.is_dir());
        drop(profile);
        assert!(!path.exists());
    }
}
