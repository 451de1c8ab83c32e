//! BrowserManager core: launch, connect, pages, shutdown.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{BrowserError, BrowserManagerConfig};
use crate::cdp::{CdpClient, PageSession};

const PORT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Manages the Chrome process, the CDP connection and the pages opened on it.
pub struct BrowserManager {
    config: BrowserManagerConfig,
    client: RwLock<Option<Arc<CdpClient>>>,
    /// Target ids of pages opened through this manager.
    pages: RwLock<Vec<String>>,
    /// Chrome process handle (if we launched it).
    chrome_process: RwLock<Option<Child>>,
}

impl BrowserManager {
    pub fn new(config: BrowserManagerConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
            pages: RwLock::new(Vec::new()),
            chrome_process: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &BrowserManagerConfig {
        &self.config
    }

    /// Find Chrome executable path.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths: &[&str] = &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];

        #[cfg(target_os = "linux")]
        let paths: &[&str] = &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths: &[&str] = &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        let paths: &[&str] = &[];

        paths.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Check if Chrome is already answering on the debug port.
    async fn is_chrome_running(&self) -> bool {
        reqwest::get(&format!("{}/json/version", self.config.endpoint()))
            .await
            .is_ok()
    }

    /// Launch Chrome with remote debugging enabled.
    async fn launch_chrome(&self) -> Result<Child, BrowserError> {
        let chrome_path = match &self.config.chrome_path {
            Some(path) => path.clone(),
            None => Self::find_chrome().ok_or(BrowserError::ChromeNotFound)?,
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.config.profile_dir).await {
            warn!("Failed to create profile directory: {}", e);
        }

        info!(
            "Launching Chrome with profile at: {}",
            self.config.profile_dir.display()
        );

        let child = Command::new(&chrome_path)
            .args(self.config.launch_args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::LaunchFailed(format!("{}: {}", chrome_path.display(), e)))?;

        info!("Chrome launched with PID: {:?}", child.id());
        Ok(child)
    }

    /// Connect to the browser, launching it if necessary.
    pub async fn connect(&self) -> Result<(), BrowserError> {
        if self.client.read().await.is_some() {
            return Ok(());
        }

        if self.is_chrome_running().await {
            info!("Chrome already running on port {}", self.config.debug_port);
        } else {
            info!("Chrome not running on port {}, launching...", self.config.debug_port);
            let child = self.launch_chrome().await?;
            *self.chrome_process.write().await = Some(child);

            let started = Instant::now();
            loop {
                tokio::time::sleep(PORT_POLL_INTERVAL).await;
                if self.is_chrome_running().await {
                    break;
                }
                if started.elapsed() > self.config.launch_timeout {
                    return Err(BrowserError::LaunchFailed(
                        "Chrome failed to start within timeout".to_string(),
                    ));
                }
            }
        }

        let client = CdpClient::connect(&self.config.endpoint(), self.config.call_timeout).await?;
        *self.client.write().await = Some(Arc::new(client));

        info!("Connected to Chrome at {}", self.config.endpoint());
        Ok(())
    }

    /// Ensure a live connection, replacing one whose socket has closed.
    pub async fn ensure_connected(&self) -> Result<(), BrowserError> {
        let stale = matches!(&*self.client.read().await, Some(client) if !client.is_connected());
        if stale {
            warn!("CDP connection lost, reconnecting");
            self.client.write().await.take();
            self.pages.write().await.clear();
        }
        self.connect().await
    }

    async fn client(&self) -> Result<Arc<CdpClient>, BrowserError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(BrowserError::NotConnected)
    }

    /// Open a blank tab, connecting first if needed.
    pub async fn new_page(&self) -> Result<Arc<PageSession>, BrowserError> {
        self.ensure_connected().await?;
        let session = self.client().await?.new_page().await?;
        self.pages.write().await.push(session.target_id().to_string());
        debug!("Opened page {}", session.target_id());
        Ok(Arc::new(session))
    }

    /// Number of pages opened and not yet closed.
    pub async fn page_count(&self) -> usize {
        self.pages.read().await.len()
    }

    /// Close every page and drop the connection.
    pub async fn close(&self) -> Result<(), BrowserError> {
        let pages: Vec<String> = self.pages.write().await.drain(..).collect();
        if let Some(client) = self.client.write().await.take() {
            for target_id in pages {
                if let Err(e) = client.close_page(&target_id).await {
                    debug!("Failed to close page {}: {}", target_id, e);
                }
            }
        }
        info!("Browser connection closed");
        Ok(())
    }

    /// Close, then stop Chrome if we launched it.
    pub async fn shutdown_chrome(&self) -> Result<(), BrowserError> {
        self.close().await?;
        if let Some(mut child) = self.chrome_process.write().await.take() {
            info!("Shutting down Chrome...");
            if let Err(e) = child.kill().await {
                warn!("Failed to stop Chrome: {}", e);
            }
        }
        Ok(())
    }
}
