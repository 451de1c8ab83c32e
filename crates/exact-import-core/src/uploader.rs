//! Submits one document to the XML import page.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use exact_import_config::Config;

use crate::artifacts::RunArtifacts;
use crate::document::{Document, DocumentStatus};
use crate::error::ImportError;
use crate::page::BrowserPage;

const FILE_INPUT: &str = "#txtFile";
const IMPORT_BUTTON: &str = "#btnImport";

pub struct DocumentUploader {
    config: Arc<Config>,
    artifacts: RunArtifacts,
}

impl DocumentUploader {
    pub fn new(config: Arc<Config>, artifacts: RunArtifacts) -> Self {
        Self { config, artifacts }
    }

    /// Import `document` and rename it once the server confirms, returning the new path.
    ///
    /// A confirmation that does not arrive within the upload timeout is an
    /// [`ImportError::Transport`] and leaves the file untouched.
    pub async fn upload(&self, page: &dyn BrowserPage, document: &mut Document) -> Result<PathBuf, ImportError> {
        let division = self
            .config
            .exact
            .division
            .as_deref()
            .ok_or_else(|| ImportError::Configuration("exact.division is not set".to_string()))?;

        info!("Uploading {}", document.name);
        document.status = DocumentStatus::Uploading;
        if let Err(e) = self.submit(page, document, division).await {
            document.status = DocumentStatus::Pending;
            return Err(e);
        }

        let label = self.artifacts.upload_label(&document.name);
        if let Err(e) = self.artifacts.screenshot(page, &label).await {
            warn!("Could not capture upload screenshot for {}: {}", document.name, e);
        }

        let consumed = document
            .mark_uploaded(&self.config.documents.consumed_suffix)
            .await?;
        info!("Uploaded {}", document.name);
        Ok(consumed)
    }

    async fn submit(&self, page: &dyn BrowserPage, document: &Document, division: &str) -> Result<(), ImportError> {
        page.goto(&self.config.exact.upload_url(division)).await?;
        page.set_input_files(FILE_INPUT, &document.path).await?;
        page.click(IMPORT_BUTTON).await?;

        let timeout = self.config.timings.upload_timeout();
        page.wait_for_navigation(timeout).await.map_err(|e| {
            if e.is_transport() {
                ImportError::Transport(format!(
                    "import of {} not confirmed within {}s: {}",
                    document.name,
                    timeout.as_secs(),
                    e
                ))
            } else {
                e.into()
            }
        })
    }
}
