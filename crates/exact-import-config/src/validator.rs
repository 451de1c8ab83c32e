//! Configuration validation.

use std::fmt;

use url::Url;

use crate::error::ConfigError;
use crate::schema::{Config, LoginMode};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Collapse into a single error listing every problem, or `Ok` when valid.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.is_valid() {
            return Ok(self.warnings);
        }
        let joined = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Invalid(joined))
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_exact(config, &mut result);
        Self::validate_credentials(config, &mut result);
        Self::validate_documents(config, &mut result);
        Self::validate_timings(config, &mut result);

        result
    }

    fn validate_exact(config: &Config, result: &mut ValidationResult) {
        let division_missing = config
            .exact
            .division
            .as_deref()
            .is_none_or(|d| d.trim().is_empty());
        if division_missing {
            result.add_error(ValidationError::new(
                "exact.division",
                "division is required (set EXACT_DIVISION)",
            ));
        }

        match Url::parse(&config.exact.base_url) {
            Ok(url) if url.scheme() == "https" || url.scheme() == "http" => {}
            _ => result.add_error(ValidationError::new(
                "exact.base_url",
                "base_url must be an http:// or https:// URL",
            )),
        }

        if config.exact.topic.is_empty() {
            result.add_error(ValidationError::new("exact.topic", "topic cannot be empty"));
        }
    }

    fn validate_credentials(config: &Config, result: &mut ValidationResult) {
        let creds = &config.credentials;
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.is_empty());

        match creds.login_mode {
            LoginMode::Automatic => {
                if blank(&creds.username) {
                    result.add_error(ValidationError::new(
                        "credentials.username",
                        "username is required for automatic login (set USERNAME)",
                    ));
                }
                if blank(&creds.password) {
                    result.add_error(ValidationError::new(
                        "credentials.password",
                        "password is required for automatic login (set PASSWORD)",
                    ));
                }
                if blank(&creds.otp_secret) {
                    result.add_warning(ValidationWarning::new(
                        "credentials.otp_secret",
                        "no OTP secret configured, a one-time code must be passed with --otp",
                    ));
                }
            }
            LoginMode::Manual => match creds.manual_login_url.as_deref() {
                None | Some("") => result.add_error(ValidationError::new(
                    "credentials.manual_login_url",
                    "manual login requires a login URL (set EXACT_MANUAL_LOGIN_URL)",
                )),
                Some(url) if Url::parse(url).is_err() => result.add_error(ValidationError::new(
                    "credentials.manual_login_url",
                    format!("'{}' is not a valid URL", url),
                )),
                Some(_) => {}
            },
        }
    }

    fn validate_documents(config: &Config, result: &mut ValidationResult) {
        if config.documents.extension.is_empty() {
            result.add_error(ValidationError::new(
                "documents.extension",
                "extension cannot be empty",
            ));
        }

        if config.documents.consumed_suffix.is_empty() {
            result.add_error(ValidationError::new(
                "documents.consumed_suffix",
                "consumed_suffix cannot be empty",
            ));
        } else if config.documents.consumed_suffix.ends_with(&config.documents.extension) {
            result.add_error(ValidationError::new(
                "documents.consumed_suffix",
                "consumed files would still match the document extension",
            ));
        }
    }

    fn validate_timings(config: &Config, result: &mut ValidationResult) {
        if config.timings.upload_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "timings.upload_timeout_ms",
                "upload_timeout_ms must be greater than 0",
            ));
        }

        if config.timings.navigation_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "timings.navigation_timeout_ms",
                "navigation_timeout_ms must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
