//! Run directory layout and diagnostic output.
//!
//! ```text
//! {temp_dir}/
//! ├── cache/
//! │   ├── user-data-dir/        browser profile
//! │   └── session-data          opaque session blob
//! ├── screenshots/{date}/*.png
//! ├── error-logs/{date}/
//! │   ├── {file}-{ts}-errors.json
//! │   ├── {ts}-all-errors.json
//! │   └── {ts}-all-errors.csv
//! └── logs/                     tracing output
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::extractor::ErrorRow;
use crate::page::BrowserPage;

/// Paths derived from the temp directory for one run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub user_data_dir: PathBuf,
    pub session_file: PathBuf,
    pub screenshots_dir: PathBuf,
    pub error_logs_dir: PathBuf,
    pub logs_dir: PathBuf,
    /// Filename-safe run timestamp shared by every artifact of the run.
    pub timestamp: String,
}

impl RunPaths {
    pub fn new(temp_dir: &Path, started_at: DateTime<Utc>) -> Self {
        let date = started_at.format("%Y-%m-%d").to_string();
        let cache = temp_dir.join("cache");
        Self {
            user_data_dir: cache.join("user-data-dir"),
            session_file: cache.join("session-data"),
            screenshots_dir: temp_dir.join("screenshots").join(&date),
            error_logs_dir: temp_dir.join("error-logs").join(&date),
            logs_dir: temp_dir.join("logs"),
            timestamp: started_at.format("%Y-%m-%dT%H-%M-%S%.3fZ").to_string(),
        }
    }

    /// Create every directory of the layout.
    pub async fn ensure(&self) -> Result<(), ImportError> {
        for dir in [
            &self.user_data_dir,
            &self.screenshots_dir,
            &self.error_logs_dir,
            &self.logs_dir,
        ] {
            fs::create_dir_all(dir).await?;
        }
        if let Some(parent) = self.session_file.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

/// Writes screenshots and error logs for a run.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    paths: RunPaths,
}

impl RunArtifacts {
    pub fn new(paths: RunPaths) -> Self {
        Self { paths }
    }

    /// Save a screenshot of `page` as `{label}.png`.
    pub async fn screenshot(&self, page: &dyn BrowserPage, label: &str) -> Result<PathBuf, ImportError> {
        let png = page.screenshot().await?;
        let path = self.paths.screenshots_dir.join(format!("{}.png", label));
        fs::create_dir_all(&self.paths.screenshots_dir).await?;
        fs::write(&path, png).await?;
        debug!("Screenshot saved to {:?}", path);
        Ok(path)
    }

    /// Screenshot that must not mask the error being reported.
    pub async fn diagnostic_screenshot(&self, page: &dyn BrowserPage) -> Option<PathBuf> {
        let label = format!("{}-failure", self.paths.timestamp);
        match self.screenshot(page, &label).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Could not capture diagnostic screenshot: {}", e);
                None
            }
        }
    }

    pub fn upload_label(&self, document: &str) -> String {
        format!("{}-{}-upload", document, self.paths.timestamp)
    }

    pub fn errors_label(&self, document: &str) -> String {
        format!("{}-{}-errors", document, self.paths.timestamp)
    }

    /// `{file}-{ts}-errors.json`
    pub async fn write_document_log(&self, document: &str, rows: &[ErrorRow]) -> Result<PathBuf, ImportError> {
        let path = self
            .paths
            .error_logs_dir
            .join(format!("{}.json", self.errors_label(document)));
        self.write_json(&path, rows).await?;
        Ok(path)
    }

    /// `{ts}-all-errors.json` and `{ts}-all-errors.csv`; written even when `rows` is empty.
    pub async fn write_aggregate_logs(&self, rows: &[ErrorRow]) -> Result<(PathBuf, PathBuf), ImportError> {
        let json_path = self
            .paths
            .error_logs_dir
            .join(format!("{}-all-errors.json", self.paths.timestamp));
        let csv_path = self
            .paths
            .error_logs_dir
            .join(format!("{}-all-errors.csv", self.paths.timestamp));

        self.write_json(&json_path, rows).await?;
        fs::write(&csv_path, to_csv(rows)).await?;
        debug!("Aggregate logs written to {:?} and {:?}", json_path, csv_path);
        Ok((json_path, csv_path))
    }

    async fn write_json(&self, path: &Path, rows: &[ErrorRow]) -> Result<(), ImportError> {
        fs::create_dir_all(&self.paths.error_logs_dir).await?;
        let content = serde_json::to_string_pretty(rows)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

/// Rows flattened with `;` between fields and `\n` between rows.
pub fn to_csv(rows: &[ErrorRow]) -> String {
    rows.iter()
        .map(|row| row.join(";"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn started_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    fn row(cells: &[&str]) -> ErrorRow {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_run_paths_layout() {
        let paths = RunPaths::new(Path::new("/tmp/run"), started_at());
        assert_eq!(paths.user_data_dir, PathBuf::from("/tmp/run/cache/user-data-dir"));
        assert_eq!(paths.session_file, PathBuf::from("/tmp/run/cache/session-data"));
        assert_eq!(paths.screenshots_dir, PathBuf::from("/tmp/run/screenshots/2024-03-05"));
        assert_eq!(paths.error_logs_dir, PathBuf::from("/tmp/run/error-logs/2024-03-05"));
        assert_eq!(paths.timestamp, "2024-03-05T14-07-09.000Z");
        assert!(!paths.timestamp.contains(':'));
    }

    #[tokio::test]
    async fn test_ensure_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let paths = RunPaths::new(temp_dir.path(), started_at());
        paths.ensure().await.unwrap();

        assert!(paths.user_data_dir.is_dir());
        assert!(paths.screenshots_dir.is_dir());
        assert!(paths.error_logs_dir.is_dir());
        assert!(paths.logs_dir.is_dir());
    }

    #[test]
    fn test_to_csv() {
        let rows = vec![row(&["", "2024-01-01", "J1"]), row(&["x", "y"])];
        assert_eq!(to_csv(&rows), ";2024-01-01;J1\nx;y");
        assert_eq!(to_csv(&[]), "");
    }

    #[tokio::test]
    async fn test_write_logs() {
        let temp_dir = TempDir::new().unwrap();
        let artifacts = RunArtifacts::new(RunPaths::new(temp_dir.path(), started_at()));
        let rows = vec![row(&["a", "b"]), row(&["c", "d"])];

        let doc_log = artifacts.write_document_log("jan.xml", &rows).await.unwrap();
        assert!(doc_log.ends_with("jan.xml-2024-03-05T14-07-09.000Z-errors.json"));
        let parsed: Vec<Vec<String>> =
            serde_json::from_str(&std::fs::read_to_string(&doc_log).unwrap()).unwrap();
        assert_eq!(parsed, rows);

        let (json, csv) = artifacts.write_aggregate_logs(&rows).await.unwrap();
        assert!(json.ends_with("2024-03-05T14-07-09.000Z-all-errors.json"));
        assert_eq!(std::fs::read_to_string(csv).unwrap(), "a;b\nc;d");
    }

    #[tokio::test]
    async fn test_write_empty_aggregate() {
        let temp_dir = TempDir::new().unwrap();
        let artifacts = RunArtifacts::new(RunPaths::new(temp_dir.path(), started_at()));

        let (json, csv) = artifacts.write_aggregate_logs(&[]).await.unwrap();
        assert_eq!(std::fs::read_to_string(json).unwrap(), "[]");
        assert_eq!(std::fs::read_to_string(csv).unwrap(), "");
    }
}
