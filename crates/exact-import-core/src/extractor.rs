//! Scrapes the import result list shown after an upload.
//!
//! Exact renders one row per validation message, newest first. A cell either
//! holds plain text or links to the XML event of the offending transaction;
//! linked cells are resolved to a `"<journal>-<entry>"` key through the
//! two-stage decoder in [`crate::payload`].

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use exact_import_config::Config;

use crate::error::{ImportError, PageError};
use crate::page::BrowserPage;
use crate::payload::{self, UNKNOWN_KEY};

/// One extracted result row, cell values in column order.
pub type ErrorRow = Vec<String>;

pub(crate) const MESSAGES_OPTION: &str = "input[id=Messages1]";
pub(crate) const PAGE_SIZE_INPUT: &str = "input[id=List_ps]";
pub(crate) const SHOW_BUTTON: &str = "#List_Show";

/// Reads the table as `[[{text, href}]]`; `href` is the absolute attachment link or null.
pub const READ_TABLE_SCRIPT: &str = r#"Array.from(document.querySelectorAll('#List_TableBody tr[class^=Data]')).map((tr) =>
  Array.from(tr.querySelectorAll('td')).map((td) => {
    const a = td.querySelector('a[href^=SysAttachmentView]');
    return { text: td.innerText, href: a ? a.href : null };
  }))"#;

/// Ticks "show messages" and raises the page size; returns whether both controls exist.
pub fn prepare_list_script(page_size: u32) -> String {
    format!(
        r#"(() => {{
  const messages = document.querySelector('{messages}');
  if (messages) messages.checked = true;
  const pageSize = document.querySelector('{page_size_input}');
  if (pageSize) pageSize.value = '{page_size}';
  return Boolean(messages && pageSize);
}})()"#,
        messages = MESSAGES_OPTION,
        page_size_input = PAGE_SIZE_INPUT,
        page_size = page_size,
    )
}

#[derive(Debug, Deserialize)]
struct RawCell {
    #[serde(default)]
    text: String,
    #[serde(default)]
    href: Option<String>,
}

/// What a cell resolves from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CellSource {
    Text(String),
    Attachment { attachment_id: String, division: String },
    BrokenLink(String),
}

impl CellSource {
    fn classify(cell: RawCell) -> Self {
        match cell.href {
            None => CellSource::Text(cell.text),
            Some(href) => match parse_attachment_link(&href) {
                Some((attachment_id, division)) => CellSource::Attachment {
                    attachment_id,
                    division,
                },
                None => CellSource::BrokenLink(href),
            },
        }
    }
}

/// `(AttachmentID, _Division_)` from an attachment link.
pub fn parse_attachment_link(href: &str) -> Option<(String, String)> {
    let url = Url::parse(href).ok()?;
    let mut attachment_id = None;
    let mut division = None;
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            "AttachmentID" if !value.is_empty() => attachment_id = Some(value.into_owned()),
            "_Division_" if !value.is_empty() => division = Some(value.into_owned()),
            _ => {}
        }
    }
    Some((attachment_id?, division?))
}

/// Extracts the result rows of the most recent import.
pub struct ErrorExtractor {
    config: Arc<Config>,
}

impl ErrorExtractor {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Rows of the result list in chronological order (oldest first).
    pub async fn extract(&self, page: &dyn BrowserPage) -> Result<Vec<ErrorRow>, ImportError> {
        let found = page
            .evaluate(&prepare_list_script(self.config.list.page_size))
            .await?;
        if found.as_bool() != Some(true) {
            warn!("Result list options not found, reading the list as rendered");
        }

        page.click(SHOW_BUTTON).await?;
        // The refresh may re-render in place; the settle delay covers that case.
        match page.wait_for_navigation(self.config.timings.navigation_timeout()).await {
            Ok(()) => {}
            Err(PageError::Timeout(message)) => {
                debug!("List refresh did not navigate ({}), relying on settle delay", message);
            }
            Err(e) => return Err(e.into()),
        }
        tokio::time::sleep(self.config.timings.list_settle()).await;

        let table = page.evaluate(READ_TABLE_SCRIPT).await?;
        let raw_rows: Vec<Vec<RawCell>> = serde_json::from_value(table)
            .map_err(|e| PageError::Script(format!("unexpected result table shape: {}", e)))?;
        debug!("Result table has {} row(s)", raw_rows.len());

        let mut rows = self.resolve_rows(page, raw_rows).await?;
        rows.reverse();

        info!("Extracted {} result row(s)", rows.len());
        Ok(rows)
    }

    /// Resolve every cell of every row concurrently and wait for all of them.
    async fn resolve_rows(
        &self,
        page: &dyn BrowserPage,
        raw_rows: Vec<Vec<RawCell>>,
    ) -> Result<Vec<ErrorRow>, ImportError> {
        let row_futures = raw_rows.into_iter().map(|raw_row| async move {
            let cells = join_all(
                raw_row
                    .into_iter()
                    .map(|cell| self.resolve_cell(page, CellSource::classify(cell))),
            )
            .await;
            cells.into_iter().collect::<Result<ErrorRow, ImportError>>()
        });

        join_all(row_futures).await.into_iter().collect()
    }

    async fn resolve_cell(&self, page: &dyn BrowserPage, source: CellSource) -> Result<String, ImportError> {
        match source {
            CellSource::Text(text) => Ok(text),
            CellSource::BrokenLink(href) => {
                warn!("Attachment link without identifiers: {}", href);
                Ok(UNKNOWN_KEY.to_string())
            }
            CellSource::Attachment {
                attachment_id,
                division,
            } => {
                let url = self.config.exact.event_url(&attachment_id, &division);
                let response = page.fetch_text(&url).await?;
                let key = payload::decode_event_payload(&response)?;
                if key == UNKNOWN_KEY {
                    warn!("Event {} lacks journal/entry fields", attachment_id);
                }
                Ok(key)
            }
        }
    }
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
