//! Contracts the workflow needs from the browser layer.
//!
//! Every call on a [`BrowserPage`] is a suspension point and the page is a
//! single shared resource: callers issue page operations one at a time. The
//! only operation expected to run concurrently with itself is
//! [`BrowserPage::fetch_text`], which performs a read-only request from
//! inside the page's execution context.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PageError;

/// One tab of a browser, already attached and ready for commands.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait for the document to load.
    async fn goto(&self, url: &str) -> Result<(), PageError>;

    /// Current top-level URL.
    async fn current_url(&self) -> Result<String, PageError>;

    /// Wait until `selector` matches an element.
    async fn wait_for_selector(&self, selector: &str) -> Result<(), PageError>;

    /// Focus the element matched by `selector` and type `text` into it.
    async fn type_into(&self, selector: &str, text: &str) -> Result<(), PageError>;

    /// Press Enter on the focused element.
    async fn press_enter(&self) -> Result<(), PageError>;

    /// Click the element matched by `selector`.
    async fn click(&self, selector: &str) -> Result<(), PageError>;

    /// Wait for the navigation started by the previous click or key press.
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), PageError>;

    /// Attach a local file to a file input.
    async fn set_input_files(&self, selector: &str, path: &Path) -> Result<(), PageError>;

    /// Evaluate a script in the page, awaiting promises, returning its JSON value.
    async fn evaluate(&self, script: &str) -> Result<Value, PageError>;

    /// Fetch `url` from inside the page (sharing its cookies) and return the body text.
    async fn fetch_text(&self, url: &str) -> Result<String, PageError>;

    /// PNG bytes of the visible viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, PageError>;

    /// Opaque serialized authenticated state of this page's browser context.
    async fn export_session(&self) -> Result<Vec<u8>, PageError>;

    /// Restore state previously produced by [`BrowserPage::export_session`].
    async fn import_session(&self, blob: &[u8]) -> Result<(), PageError>;
}

/// A launched browser able to hand out pages.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open (launching the browser process first if needed) a fresh page.
    async fn open_page(&self) -> Result<Arc<dyn BrowserPage>, PageError>;

    /// Close every page and stop the browser process if this instance started it.
    async fn close(&self) -> Result<(), PageError>;
}
