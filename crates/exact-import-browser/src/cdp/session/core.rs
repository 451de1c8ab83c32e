//! Core session struct and CDP command dispatch.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::debug;

use crate::cdp::client::CdpChannel;
use crate::cdp::error::CdpError;
use crate::cdp::protocol::ScreenshotFormat;

/// A session attached to a single page/target.
pub struct PageSession {
    pub(super) target_id: String,
    pub(super) session_id: String,
    pub(super) channel: Arc<CdpChannel>,
}

impl PageSession {
    pub(crate) fn new(target_id: String, session_id: String, channel: Arc<CdpChannel>) -> Self {
        Self {
            target_id,
            session_id,
            channel,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Whether the underlying WebSocket is still open.
    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.channel.call(method, params, Some(&self.session_id)).await
    }

    /// Enable required CDP domains.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        self.call("Network.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Capture the viewport as PNG bytes.
    pub async fn screenshot(&self) -> Result<Vec<u8>, CdpError> {
        let result = self
            .call(
                "Page.captureScreenshot",
                Some(json!({
                    "format": ScreenshotFormat::Png,
                    "captureBeyondViewport": false,
                })),
            )
            .await?;

        let data = result["data"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))?;
        decode_screenshot(data)
    }
}

pub(super) fn decode_screenshot(data: &str) -> Result<Vec<u8>, CdpError> {
    STANDARD
        .decode(data)
        .map_err(|e| CdpError::InvalidResponse(format!("Screenshot is not base64: {}", e)))
}
