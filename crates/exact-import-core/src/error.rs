//! Error taxonomy for an import run.
//!
//! Business errors (validation messages reported by Exact for a document)
//! are not represented here: they are data, see [`crate::ErrorRow`].

use std::path::PathBuf;

use thiserror::Error;

use crate::payload::PayloadError;
use crate::store::SessionStoreError;

/// Failures of a page primitive.
#[derive(Debug, Error)]
pub enum PageError {
    /// Waiting for load, navigation or a selector ran out of time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The browser reported a failed navigation.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The browser connection dropped or could not be established.
    #[error("Browser disconnected: {0}")]
    Disconnected(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// A script threw or returned an unexpected shape.
    #[error("Script error: {0}")]
    Script(String),

    #[error("Browser error: {0}")]
    Other(String),
}

impl PageError {
    /// Whether the failure is a transient transport fault rather than a page-state problem.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PageError::Timeout(_) | PageError::Navigation(_) | PageError::Disconnected(_)
        )
    }
}

/// Run-level errors.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Required configuration is absent or invalid; no browser was opened.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The login flow could not produce an authenticated session.
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    /// Navigation or confirmation timed out; the batch may be retried.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The target directory has no document awaiting upload.
    #[error("No candidate documents in {}", .0.display())]
    NoCandidates(PathBuf),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Store(#[from] SessionStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ImportError {
    pub fn authentication(reason: impl Into<String>) -> Self {
        ImportError::Authentication {
            reason: reason.into(),
        }
    }

    /// Transport faults trigger the single whole-batch retry.
    pub fn is_transport(&self) -> bool {
        match self {
            ImportError::Transport(_) => true,
            ImportError::Page(e) => e.is_transport(),
            _ => false,
        }
    }
}

impl From<exact_import_config::ConfigError> for ImportError {
    fn from(e: exact_import_config::ConfigError) -> Self {
        ImportError::Configuration(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_error_transport_classification() {
        assert!(PageError::Timeout("load".into()).is_transport());
        assert!(PageError::Navigation("net::ERR_ABORTED".into()).is_transport());
        assert!(PageError::Disconnected("socket closed".into()).is_transport());
        assert!(!PageError::ElementNotFound("#txtFile".into()).is_transport());
        assert!(!PageError::Script("TypeError".into()).is_transport());
    }

    #[test]
    fn test_import_error_transport_classification() {
        assert!(ImportError::Transport("upload confirmation".into()).is_transport());
        assert!(ImportError::from(PageError::Timeout("x".into())).is_transport());
        assert!(!ImportError::authentication("still on login page").is_transport());
        assert!(!ImportError::Configuration("division".into()).is_transport());
        assert!(!ImportError::NoCandidates(PathBuf::from("/tmp")).is_transport());
    }

    #[test]
    fn test_display() {
        let err = ImportError::authentication("OTP unobtainable");
        assert_eq!(err.to_string(), "Authentication failed: OTP unobtainable");

        let err = ImportError::NoCandidates(PathBuf::from("/data/in"));
        assert_eq!(err.to_string(), "No candidate documents in /data/in");
    }

    #[test]
    fn test_config_error_maps_to_configuration() {
        let err: ImportError =
            exact_import_config::ConfigError::Invalid("exact.division: required".into()).into();
        assert!(matches!(err, ImportError::Configuration(ref m) if m.contains("exact.division")));
    }
}
