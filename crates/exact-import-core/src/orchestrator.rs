//! Runs a whole import batch.
//!
//! One page, one login, then every pending document strictly in order:
//! upload, extract the result list, log. A transport failure anywhere in the
//! batch restarts it once from a fresh scan (documents already renamed are
//! skipped). Anything else, or a second transport failure, is fatal and is
//! preceded by a diagnostic screenshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use exact_import_config::Config;

use crate::artifacts::RunArtifacts;
use crate::document::{Document, DocumentScanner};
use crate::error::ImportError;
use crate::extractor::{ErrorExtractor, ErrorRow};
use crate::login::{OperatorPrompt, SessionManager};
use crate::page::{Browser, BrowserPage};
use crate::store::SessionStore;
use crate::summary::{ErrorSummarizer, ErrorSummary};
use crate::uploader::DocumentUploader;

/// Outcome of one imported document.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub name: String,
    pub uploaded_as: PathBuf,
    pub rows: usize,
    pub log: PathBuf,
}

/// Outcome of [`UploadOrchestrator::run`].
#[derive(Debug, Default)]
pub struct RunReport {
    pub documents: Vec<DocumentReport>,
    /// Every document's rows in upload order, kept across the retry.
    pub rows: Vec<ErrorRow>,
    pub summary: ErrorSummary,
    pub attempts: usize,
    pub aggregate_json: Option<PathBuf>,
    pub aggregate_csv: Option<PathBuf>,
}

pub struct UploadOrchestrator {
    browser: Arc<dyn Browser>,
    sessions: SessionManager,
    uploader: DocumentUploader,
    extractor: ErrorExtractor,
    scanner: DocumentScanner,
    artifacts: RunArtifacts,
}

impl UploadOrchestrator {
    pub fn new(
        config: Arc<Config>,
        browser: Arc<dyn Browser>,
        store: Arc<dyn SessionStore>,
        prompt: Arc<dyn OperatorPrompt>,
        artifacts: RunArtifacts,
    ) -> Self {
        Self {
            browser,
            sessions: SessionManager::new(config.clone(), store, prompt),
            uploader: DocumentUploader::new(config.clone(), artifacts.clone()),
            extractor: ErrorExtractor::new(config.clone()),
            scanner: DocumentScanner::new(config.documents.extension.clone()),
            artifacts,
        }
    }

    /// Explicit one-time code for the second-factor challenge.
    pub fn with_otp_code(mut self, code: Option<String>) -> Self {
        self.sessions = self.sessions.with_otp_code(code);
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Import every pending document in `dir`.
    ///
    /// Fails with [`ImportError::NoCandidates`] before touching the browser
    /// when nothing is pending.
    pub async fn run(&self, dir: &Path) -> Result<RunReport, ImportError> {
        let documents = self.scanner.scan_required(dir).await?;

        let mut report = RunReport::default();
        let mut page = None;
        let result = match self.attempt(documents, &mut page, &mut report).await {
            Err(e) if e.is_transport() => {
                warn!("{}; retrying the batch once", e);
                match self.scanner.scan(dir).await {
                    Ok(documents) if documents.is_empty() => {
                        info!("Nothing left to upload on retry");
                        Ok(())
                    }
                    Ok(documents) => self.attempt(documents, &mut page, &mut report).await,
                    Err(e) => Err(e),
                }
            }
            other => other,
        };

        if let Err(e) = &result {
            self.capture_failure(page.as_deref(), e).await;
        }
        self.close_browser().await;
        result?;

        report.summary = ErrorSummarizer::summarize(&report.rows);
        let (json, csv) = self.artifacts.write_aggregate_logs(&report.rows).await?;
        report.aggregate_json = Some(json);
        report.aggregate_csv = Some(csv);

        info!(
            "Uploaded {} document(s) in {} attempt(s), {} error row(s)",
            report.documents.len(),
            report.attempts,
            report.summary.total
        );
        if !report.summary.is_empty() {
            info!("Error summary:\n{}", report.summary);
        }
        Ok(report)
    }

    /// Authenticate and persist the session without uploading.
    pub async fn login(&self) -> Result<(), ImportError> {
        let mut page = None;
        let result = self.open_authenticated(&mut page).await.map(|_| ());
        if let Err(e) = &result {
            self.capture_failure(page.as_deref(), e).await;
        }
        self.close_browser().await;
        result
    }

    async fn attempt(
        &self,
        documents: Vec<Document>,
        page_slot: &mut Option<Arc<dyn BrowserPage>>,
        report: &mut RunReport,
    ) -> Result<(), ImportError> {
        report.attempts += 1;
        let page = self.open_authenticated(page_slot).await?;

        for mut document in documents {
            let uploaded_as = self.uploader.upload(page.as_ref(), &mut document).await?;

            let rows = self.extractor.extract(page.as_ref()).await?;
            let label = self.artifacts.errors_label(&document.name);
            if let Err(e) = self.artifacts.screenshot(page.as_ref(), &label).await {
                warn!("Could not capture result list screenshot: {}", e);
            }
            let log = self.artifacts.write_document_log(&document.name, &rows).await?;
            if !rows.is_empty() {
                warn!("{} reported {} error row(s)", document.name, rows.len());
            }

            report.documents.push(DocumentReport {
                name: document.name.clone(),
                uploaded_as,
                rows: rows.len(),
                log,
            });
            report.rows.extend(rows);
        }
        Ok(())
    }

    async fn open_authenticated(
        &self,
        page_slot: &mut Option<Arc<dyn BrowserPage>>,
    ) -> Result<Arc<dyn BrowserPage>, ImportError> {
        let page = self.browser.open_page().await?;
        *page_slot = Some(page.clone());
        self.sessions.authenticate(page.as_ref()).await?;
        Ok(page)
    }

    async fn capture_failure(&self, page: Option<&dyn BrowserPage>, e: &ImportError) {
        error!("Run failed: {}", e);
        if let Some(page) = page {
            if let Some(path) = self.artifacts.diagnostic_screenshot(page).await {
                error!("Diagnostic screenshot saved to {:?}", path);
            }
        }
    }

    async fn close_browser(&self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
