//! Configuration loader.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::{Config, LoginMode};

/// Environment variable names recognised by [`ConfigLoader::apply_env`].
pub mod env {
    pub const USERNAME: &str = "USERNAME";
    pub const PASSWORD: &str = "PASSWORD";
    pub const DIVISION: &str = "EXACT_DIVISION";
    pub const OTP_SECRET: &str = "EXACT_OTP_SECRET";
    pub const LOGIN_MODE: &str = "EXACT_LOGIN_MODE";
    pub const MANUAL_LOGIN_URL: &str = "EXACT_MANUAL_LOGIN_URL";
    pub const BASE_URL: &str = "EXACT_BASE_URL";
    pub const HEADLESS: &str = "HEADLESS";
}

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file, expanding `${VAR}` from the process environment.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let path = Self::expand_path(path);
        let path = path.as_path();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str_with(&content, &Self::process_env())
    }

    /// Load configuration from a string, expanding `${VAR}` from `vars`.
    pub fn load_str_with(content: &str, vars: &HashMap<String, String>) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content, vars)?;
        let mut config: Config = toml::from_str(&expanded)?;
        config.browser.chrome_path = config.browser.chrome_path.as_deref().map(Self::expand_path);
        Ok(config)
    }

    /// Build the run configuration: optional file, then environment overlay.
    pub fn resolve(path: Option<&Path>) -> Result<Config, ConfigError> {
        let vars = Self::process_env();
        let base = match path {
            Some(p) => Self::load(p)?,
            None => Config::default(),
        };
        Self::apply_env(base, &vars)
    }

    /// Overlay well-known environment variables onto `config`.
    ///
    /// Takes an explicit map so callers (and tests) decide where values come from.
    pub fn apply_env(mut config: Config, vars: &HashMap<String, String>) -> Result<Config, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(v) = get(env::USERNAME) {
            config.credentials.username = Some(v.to_string());
        }
        if let Some(v) = get(env::PASSWORD) {
            config.credentials.password = Some(v.to_string());
        }
        if let Some(v) = get(env::DIVISION) {
            config.exact.division = Some(v.to_string());
        }
        if let Some(v) = get(env::OTP_SECRET) {
            config.credentials.otp_secret = Some(v.to_string());
        }
        if let Some(v) = get(env::LOGIN_MODE) {
            config.credentials.login_mode =
                v.parse::<LoginMode>()
                    .map_err(|message| ConfigError::InvalidValue {
                        field: "credentials.login_mode".to_string(),
                        message,
                    })?;
        }
        if let Some(v) = get(env::MANUAL_LOGIN_URL) {
            config.credentials.manual_login_url = Some(v.to_string());
        }
        if let Some(v) = get(env::BASE_URL) {
            config.exact.base_url = v.to_string();
        }
        if let Some(v) = get(env::HEADLESS) {
            config.browser.headless = matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes");
        }

        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str, vars: &HashMap<String, String>) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::Invalid(e.to_string()))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = vars
                .get(var_name)
                .ok_or_else(|| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], var_value);
        }

        Ok(result)
    }

    /// Expand a leading `~` to the home directory. Non UTF-8 paths pass through.
    pub fn expand_path(path: &Path) -> PathBuf {
        match path.to_str() {
            Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
            None => path.to_path_buf(),
        }
    }

    fn process_env() -> HashMap<String, String> {
        std::env::vars().collect()
    }
}
