//! Navigation operations for CDP page session.

use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, trace};

use crate::cdp::error::CdpError;

use super::core::PageSession;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Set on the current document before an action that should leave it.
/// A fresh document does not carry the flag.
pub(super) const NAVIGATION_MARKER: &str = "__exactImportNavigation";

pub(super) fn arm_marker_script() -> String {
    format!("window.{} = true; true", NAVIGATION_MARKER)
}

pub(super) fn navigated_script() -> String {
    format!(
        "window.{} === undefined && document.readyState === 'complete'",
        NAVIGATION_MARKER
    )
}

impl PageSession {
    /// Navigate to `url` and wait for the document to finish loading.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<String, CdpError> {
        let url = url::Url::parse(url)?;
        let result = self
            .call("Page.navigate", Some(json!({"url": url.as_str()})))
            .await?;

        if let Some(error) = result.get("errorText").and_then(|e| e.as_str()) {
            return Err(CdpError::NavigationFailed(format!("{}: {}", url, error)));
        }

        let frame_id = result["frameId"].as_str().unwrap_or("main").to_string();
        self.wait_for_load(timeout).await?;

        debug!("Navigated to {}", url);
        Ok(frame_id)
    }

    /// Wait for `document.readyState` to reach "complete".
    pub async fn wait_for_load(&self, timeout: Duration) -> Result<(), CdpError> {
        self.poll_until("document.readyState === 'complete'", timeout, "Page load timeout")
            .await
    }

    /// Mark the current document so [`PageSession::wait_for_navigation`]
    /// can tell when it has been replaced.
    pub async fn arm_navigation(&self) -> Result<(), CdpError> {
        self.evaluate(&arm_marker_script()).await?;
        Ok(())
    }

    /// Wait until the armed document is gone and its successor has loaded.
    pub async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), CdpError> {
        self.poll_until(&navigated_script(), timeout, "Navigation timeout")
            .await
    }

    async fn poll_until(&self, condition: &str, timeout: Duration, what: &str) -> Result<(), CdpError> {
        let start = Instant::now();
        loop {
            // The execution context is torn down mid-navigation; keep polling.
            match self.evaluate(condition).await {
                Ok(value) if value.as_bool() == Some(true) => return Ok(()),
                Ok(_) => {}
                Err(e @ (CdpError::SessionClosed | CdpError::WebSocket(_))) => return Err(e),
                Err(e) => trace!("Poll failed while waiting: {}", e),
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout(what.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Get current URL.
    pub async fn get_url(&self) -> Result<String, CdpError> {
        let result = self.evaluate("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Wait for selector to appear.
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<i64, CdpError> {
        let start = Instant::now();

        loop {
            match self.query_selector(selector).await {
                Ok(Some(node_id)) => return Ok(node_id),
                Ok(None) => {}
                // Node ids go stale while the document is being replaced.
                Err(CdpError::Protocol { message, .. }) => trace!("querySelector failed: {}", message),
                Err(e) => return Err(e),
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout(format!(
                    "Waiting for selector '{}' timed out",
                    selector
                )));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
