//! Browser manager type definitions and configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use exact_import_config::{BrowserConfig, TimingsConfig};
use exact_import_core::PageError;

use crate::cdp::CdpError;

/// Browser manager errors.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Browser not connected")]
    NotConnected,

    #[error("Chrome not found. Install Google Chrome or set browser.chrome_path.")]
    ChromeNotFound,

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error(transparent)]
    Cdp(#[from] CdpError),
}

impl From<BrowserError> for PageError {
    fn from(e: BrowserError) -> Self {
        match e {
            BrowserError::Cdp(e) => e.into(),
            BrowserError::ConnectionFailed(_) | BrowserError::NotConnected => {
                PageError::Disconnected(e.to_string())
            }
            BrowserError::ChromeNotFound | BrowserError::LaunchFailed(_) => PageError::Other(e.to_string()),
        }
    }
}

/// Browser configuration.
#[derive(Debug, Clone)]
pub struct BrowserManagerConfig {
    /// Chrome debugging port.
    pub debug_port: u16,
    /// Profile directory; holds the browser's own persistent state.
    pub profile_dir: PathBuf,
    pub headless: bool,
    /// Explicit binary; [`crate::BrowserManager::find_chrome`] otherwise.
    pub chrome_path: Option<PathBuf>,
    /// Upper bound for a single CDP command.
    pub call_timeout: Duration,
    /// How long a freshly launched Chrome may take to open its debugging port.
    pub launch_timeout: Duration,
}

impl BrowserManagerConfig {
    pub fn new(profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            debug_port: 9222,
            profile_dir: profile_dir.into(),
            headless: false,
            chrome_path: None,
            call_timeout: Duration::from_secs(30),
            launch_timeout: Duration::from_secs(6),
        }
    }

    pub fn from_config(browser: &BrowserConfig, timings: &TimingsConfig, profile_dir: &Path) -> Self {
        Self {
            debug_port: browser.debug_port,
            headless: browser.headless,
            chrome_path: browser.chrome_path.clone(),
            call_timeout: timings.navigation_timeout(),
            ..Self::new(profile_dir)
        }
    }

    /// Get the CDP endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.debug_port)
    }

    /// Command-line arguments for launching Chrome.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.debug_port),
            format!("--user-data-dir={}", self.profile_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args
    }
}
