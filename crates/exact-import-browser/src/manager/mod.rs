//! Chrome process and connection manager.
//!
//! Launches Chrome with a dedicated profile directory and remote debugging
//! enabled (or reuses one already listening on the port), then hands out
//! attached page sessions.

mod manager_core;
mod manager_types;

pub use manager_core::BrowserManager;
pub use manager_types::{BrowserError, BrowserManagerConfig};

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
