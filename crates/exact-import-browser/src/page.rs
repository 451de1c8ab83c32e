//! [`BrowserPage`] over a CDP page session.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use exact_import_core::{BrowserPage, PageError};

use crate::cdp::{Cookie, PageSession};

/// One Chrome tab.
///
/// Clicks and key presses arm a marker on the current document first, so a
/// following [`BrowserPage::wait_for_navigation`] only returns once that
/// document has been replaced.
pub struct CdpPage {
    session: Arc<PageSession>,
    timeout: Duration,
}

impl CdpPage {
    /// `timeout` bounds page loads and selector waits.
    pub fn new(session: Arc<PageSession>, timeout: Duration) -> Self {
        Self { session, timeout }
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }
}

/// Cookie jar as the opaque session blob.
pub fn encode_session(cookies: &[Cookie]) -> Result<Vec<u8>, PageError> {
    serde_json::to_vec(cookies).map_err(|e| PageError::Other(format!("cannot encode cookies: {}", e)))
}

pub fn decode_session(blob: &[u8]) -> Result<Vec<Cookie>, PageError> {
    serde_json::from_slice(blob).map_err(|e| PageError::Other(format!("session blob is not a cookie jar: {}", e)))
}

#[async_trait]
impl BrowserPage for CdpPage {
    async fn goto(&self, url: &str) -> Result<(), PageError> {
        self.session.navigate(url, self.timeout).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.session.get_url().await?)
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<(), PageError> {
        self.session.wait_for_selector(selector, self.timeout).await?;
        Ok(())
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), PageError> {
        self.session.focus_selector(selector).await?;
        self.session.type_text(text).await?;
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), PageError> {
        self.session.arm_navigation().await?;
        self.session.press_key("Enter").await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        self.session.arm_navigation().await?;
        self.session.click_selector(selector).await?;
        Ok(())
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), PageError> {
        self.session.wait_for_navigation(timeout).await?;
        Ok(())
    }

    async fn set_input_files(&self, selector: &str, path: &Path) -> Result<(), PageError> {
        let absolute = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| PageError::Other(format!("{}: {}", path.display(), e)))?;
        self.session.set_file_input_files(selector, &absolute).await?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, PageError> {
        Ok(self.session.evaluate(script).await?)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, PageError> {
        Ok(self.session.fetch_text(url).await?)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, PageError> {
        Ok(self.session.screenshot().await?)
    }

    async fn export_session(&self) -> Result<Vec<u8>, PageError> {
        let cookies = self.session.get_all_cookies().await?;
        debug!("Exporting {} cookie(s)", cookies.len());
        encode_session(&cookies)
    }

    async fn import_session(&self, blob: &[u8]) -> Result<(), PageError> {
        let cookies = decode_session(blob)?;
        self.session.set_cookies(&cookies).await?;
        Ok(())
    }
}
