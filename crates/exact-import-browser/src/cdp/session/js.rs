//! JavaScript execution operations for CDP page session.

use serde_json::{Value, json};

use crate::cdp::error::CdpError;
use crate::cdp::protocol::ExceptionDetails;

use super::core::PageSession;

/// Expression that fetches `url` with the page's cookies and yields the body text.
pub(super) fn fetch_text_script(url: &str) -> String {
    let url = Value::String(url.to_string());
    format!(
        "fetch({}, {{ credentials: 'include' }}).then(r => {{ \
            if (!r.ok) throw new Error('HTTP ' + r.status); \
            return r.text(); \
        }})",
        url
    )
}

impl PageSession {
    /// Evaluate a JavaScript expression, awaiting it if it is a promise.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let message = serde_json::from_value::<ExceptionDetails>(exception.clone())
                .map(|details| details.message())
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CdpError::JavaScript(message));
        }

        Ok(result["result"]["value"].clone())
    }

    /// GET `url` from inside the page and return the response body.
    pub async fn fetch_text(&self, url: &str) -> Result<String, CdpError> {
        let value = self.evaluate(&fetch_text_script(url)).await?;
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse(format!("fetch of {} returned no text", url)))
    }
}
