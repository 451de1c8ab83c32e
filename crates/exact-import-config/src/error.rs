//! Configuration errors.

use thiserror::Error;

/// Why a run configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {0} does not exist")]
    NotFound(String),

    /// A recognised setting holds a value it cannot take.
    #[error("{field} cannot be used: {message}")]
    InvalidValue { field: String, message: String },

    /// `${VAR}` referenced from the config file but absent from the environment.
    #[error("Config references ${{{0}}}, which is not set")]
    EnvVarNotSet(String),

    /// One or more validation errors, joined.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}
