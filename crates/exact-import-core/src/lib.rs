//! # exact-import core
//!
//! Drives one browser session against Exact Online to import a directory of
//! XML documents, one at a time, and recovers the server-side validation
//! messages for every import.
//!
//! ## Pipeline
//!
//! ```text
//! SessionManager ──► for each document ─┬─► DocumentUploader
//!   (login FSM)                         └─► ErrorExtractor ──► logs
//!                                                   │
//!                               ErrorSummarizer ◄───┘ (run aggregate)
//! ```
//!
//! The browser itself is reached only through the [`Browser`] and
//! [`BrowserPage`] traits; `exact-import-browser` implements them over CDP.

pub mod artifacts;
pub mod document;
pub mod error;
pub mod extractor;
pub mod login;
pub mod orchestrator;
pub mod page;
pub mod payload;
pub mod store;
pub mod summary;
pub mod totp;
pub mod uploader;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use artifacts::{RunArtifacts, RunPaths};
pub use document::{Document, DocumentScanner, DocumentStatus};
pub use error::{ImportError, PageError};
pub use extractor::{ErrorExtractor, ErrorRow};
pub use login::{LoginState, OperatorPrompt, SessionManager, StdinPrompt};
pub use orchestrator::{DocumentReport, RunReport, UploadOrchestrator};
pub use page::{Browser, BrowserPage};
pub use payload::{PayloadError, UNKNOWN_KEY};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, SessionStoreError};
pub use summary::{ErrorSummarizer, ErrorSummary, RowFields};
pub use totp::{OtpSecret, TotpAlgorithm};
pub use uploader::DocumentUploader;
