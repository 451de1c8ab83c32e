//! # exact-import config
//!
//! Configuration for a bulk import run: Exact Online tenant, credentials,
//! browser launch options, document naming and timing knobs.
//!
//! A [`Config`] is built once at startup (TOML file, then environment
//! overlay), validated, and threaded through every component.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
