//! Candidate documents and their one-way completion marker.
//!
//! A document is pending while its file name ends in the configured
//! extension. Confirmed completion renames it with the consumed suffix
//! appended, which is the only durable record that it was imported.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::ImportError;

/// Lifecycle of a document within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Pending,
    Uploading,
    Uploaded,
}

/// One XML file to import.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub name: String,
    pub status: DocumentStatus,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            status: DocumentStatus::Pending,
        }
    }

    /// Path the file is renamed to once consumed.
    pub fn consumed_path(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Record completion by renaming the file. Only valid from `Uploading`.
    pub async fn mark_uploaded(&mut self, suffix: &str) -> Result<PathBuf, ImportError> {
        debug_assert_eq!(self.status, DocumentStatus::Uploading);
        let target = self.consumed_path(suffix);
        fs::rename(&self.path, &target).await?;
        self.status = DocumentStatus::Uploaded;
        debug!("Marked {} consumed as {:?}", self.name, target);
        Ok(target)
    }
}

/// Finds pending documents in a directory.
#[derive(Debug, Clone)]
pub struct DocumentScanner {
    extension: String,
}

impl DocumentScanner {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// Pending documents in `dir`, sorted by file name.
    pub async fn scan(&self, dir: &Path) -> Result<Vec<Document>, ImportError> {
        let mut documents = Vec::new();
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(&self.extension) {
                documents.push(Document::new(entry.path()));
            }
        }

        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(documents)
    }

    /// Like [`scan`](Self::scan) but an empty result is [`ImportError::NoCandidates`].
    pub async fn scan_required(&self, dir: &Path) -> Result<Vec<Document>, ImportError> {
        let documents = self.scan(dir).await?;
        if documents.is_empty() {
            return Err(ImportError::NoCandidates(dir.to_path_buf()));
        }
        info!(
            "Found {} document(s) to upload, first one: {}",
            documents.len(),
            documents[0].name
        );
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "<eExact/>").unwrap();
    }

    #[tokio::test]
    async fn test_scan_filters_on_extension() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "b.xml");
        touch(temp_dir.path(), "a.xml");
        touch(temp_dir.path(), "c.xml.uploaded");
        touch(temp_dir.path(), "notes.txt");
        std::fs::create_dir(temp_dir.path().join("dir.xml")).unwrap();

        let docs = DocumentScanner::new(".xml").scan(temp_dir.path()).await.unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.xml", "b.xml"]);
        assert!(docs.iter().all(|d| d.status == DocumentStatus::Pending));
    }

    #[tokio::test]
    async fn test_scan_required_empty_is_no_candidates() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "done.xml.uploaded");

        let result = DocumentScanner::new(".xml").scan_required(temp_dir.path()).await;
        assert!(matches!(result, Err(ImportError::NoCandidates(_))));
    }

    #[tokio::test]
    async fn test_scan_missing_dir_is_io_error() {
        let result = DocumentScanner::new(".xml")
            .scan(Path::new("/nonexistent/exact-import-input"))
            .await;
        assert!(matches!(result, Err(ImportError::Io(_))));
    }

    #[tokio::test]
    async fn test_mark_uploaded_renames_and_excludes_from_scan() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "journal.xml");
        let scanner = DocumentScanner::new(".xml");

        let mut doc = scanner.scan(temp_dir.path()).await.unwrap().remove(0);
        doc.status = DocumentStatus::Uploading;
        let target = doc.mark_uploaded(".uploaded").await.unwrap();

        assert_eq!(doc.status, DocumentStatus::Uploaded);
        assert!(target.ends_with("journal.xml.uploaded"));
        assert!(target.exists());
        assert!(!temp_dir.path().join("journal.xml").exists());
        assert!(scanner.scan(temp_dir.path()).await.unwrap().is_empty());
    }

    #[test]
    fn test_consumed_path() {
        let doc = Document::new("/in/2024-01.xml");
        assert_eq!(doc.name, "2024-01.xml");
        assert_eq!(doc.consumed_path(".uploaded"), PathBuf::from("/in/2024-01.xml.uploaded"));
    }
}
