//! Chrome DevTools Protocol (CDP) client.
//!
//! Talks to Chrome over its browser-level WebSocket using flattened target
//! sessions: one [`CdpClient`] per browser, one [`PageSession`] per tab.
//!
//! ```rust,ignore
//! let client = CdpClient::connect("http://127.0.0.1:9222", Duration::from_secs(30)).await?;
//! let page = client.new_page().await?;
//! page.navigate("https://start.exactonline.nl", Duration::from_secs(60)).await?;
//! ```

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::*;
pub use session::{KeyDefinition, PageSession};
