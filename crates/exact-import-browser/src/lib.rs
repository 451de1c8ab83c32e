//! Chrome driver for exact-import.
//!
//! Implements the [`exact_import_core::Browser`] and
//! [`exact_import_core::BrowserPage`] contracts over the Chrome DevTools
//! Protocol. Chrome is launched with a per-run profile directory and
//! remote debugging enabled; nothing beyond a local Chrome binary is needed.
//!
//! ```text
//! ┌──────────────────┐   CDP over WebSocket   ┌────────────────┐
//! │  ChromeBrowser   │ ◄────────────────────► │ Chrome/Chromium│
//! │  CdpPage per tab │                        │ (local process)│
//! └──────────────────┘                        └────────────────┘
//! ```

mod browser;
pub mod cdp;
pub mod manager;
mod page;

pub use browser::ChromeBrowser;
pub use cdp::{CdpClient, CdpError, PageSession};
pub use manager::{BrowserError, BrowserManager, BrowserManagerConfig};
pub use page::{CdpPage, decode_session, encode_session};
