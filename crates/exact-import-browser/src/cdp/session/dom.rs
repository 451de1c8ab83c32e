//! DOM operations for CDP page session.

use std::path::Path;

use serde_json::json;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::BoxModel;

use super::core::PageSession;

impl PageSession {
    /// Node id of the document root.
    pub async fn document_node(&self) -> Result<i64, CdpError> {
        let result = self
            .call("DOM.getDocument", Some(json!({"depth": 0})))
            .await?;

        result["root"]["nodeId"]
            .as_i64()
            .ok_or_else(|| CdpError::InvalidResponse("Missing root nodeId".to_string()))
    }

    /// Query selector.
    pub async fn query_selector(&self, selector: &str) -> Result<Option<i64>, CdpError> {
        let root = self.document_node().await?;

        let result = self
            .call(
                "DOM.querySelector",
                Some(json!({
                    "nodeId": root,
                    "selector": selector,
                })),
            )
            .await?;

        let node_id = result["nodeId"].as_i64().unwrap_or(0);
        if node_id == 0 {
            Ok(None)
        } else {
            Ok(Some(node_id))
        }
    }

    async fn require_selector(&self, selector: &str) -> Result<i64, CdpError> {
        self.query_selector(selector)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(selector.to_string()))
    }

    /// Get box model for node. `None` when the node is not rendered.
    pub async fn get_box_model(&self, node_id: i64) -> Result<Option<BoxModel>, CdpError> {
        let result = self
            .call("DOM.getBoxModel", Some(json!({"nodeId": node_id})))
            .await;

        match result {
            Ok(r) => {
                let model: BoxModel = serde_json::from_value(r["model"].clone())?;
                Ok(Some(model))
            }
            Err(CdpError::Protocol { code: -32000, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Focus element by selector.
    pub async fn focus_selector(&self, selector: &str) -> Result<(), CdpError> {
        let node_id = self.require_selector(selector).await?;
        self.call("DOM.focus", Some(json!({"nodeId": node_id})))
            .await?;
        Ok(())
    }

    /// Click on element by selector.
    pub async fn click_selector(&self, selector: &str) -> Result<(), CdpError> {
        let node_id = self.require_selector(selector).await?;

        self.call("DOM.scrollIntoViewIfNeeded", Some(json!({"nodeId": node_id})))
            .await?;

        let (x, y) = self
            .get_box_model(node_id)
            .await?
            .and_then(|model| model.center())
            .ok_or_else(|| CdpError::ElementNotFound(format!("{} (not visible)", selector)))?;

        self.click(x, y).await
    }

    /// Attach a local file to an `<input type="file">`.
    pub async fn set_file_input_files(&self, selector: &str, file: &Path) -> Result<(), CdpError> {
        let node_id = self.require_selector(selector).await?;

        self.call(
            "DOM.setFileInputFiles",
            Some(json!({
                "nodeId": node_id,
                "files": [file.to_string_lossy()],
            })),
        )
        .await?;
        Ok(())
    }
}
