//! Configuration schema definitions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exact: ExactConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub timings: TimingsConfig,

    #[serde(default)]
    pub documents: DocumentsConfig,

    #[serde(default)]
    pub list: ListConfig,
}

/// Remote tenant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExactConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Division (company ledger) every import is routed to.
    #[serde(default)]
    pub division: Option<String>,

    /// Import topic passed to the XML upload page.
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            division: None,
            topic: default_topic(),
        }
    }
}

impl ExactConfig {
    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn login_url(&self) -> String {
        format!("{}/docs/Login.aspx?Language=EN", self.base())
    }

    pub fn upload_url(&self, division: &str) -> String {
        format!(
            "{}/docs/XMLUpload.aspx?ui=1&Topic={}&_Division_={}",
            self.base(),
            self.topic,
            division
        )
    }

    pub fn event_url(&self, attachment_id: &str, division: &str) -> String {
        format!(
            "{}/docs/XmlEvent.aspx?ID={}&_Division_={}",
            self.base(),
            attachment_id,
            division
        )
    }
}

fn default_base_url() -> String {
    "https://start.exactonline.be".to_string()
}

fn default_topic() -> String {
    "GLTransactions".to_string()
}

/// How the run obtains an authenticated session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMode {
    /// Username, password and TOTP are entered by the tool.
    #[default]
    Automatic,
    /// An operator completes the login in the visible browser window.
    Manual,
}

impl FromStr for LoginMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(LoginMode::Automatic),
            "manual" => Ok(LoginMode::Manual),
            other => Err(format!("unknown login mode '{}'", other)),
        }
    }
}

impl fmt::Display for LoginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginMode::Automatic => f.write_str("automatic"),
            LoginMode::Manual => f.write_str("manual"),
        }
    }
}

/// Login credentials. Never serialized back out.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// `otpauth://totp/...` URI or a bare base32 secret.
    #[serde(default, skip_serializing)]
    pub otp_secret: Option<String>,

    #[serde(default)]
    pub login_mode: LoginMode,

    #[serde(default)]
    pub manual_login_url: Option<String>,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("otp_secret", &self.otp_secret.as_ref().map(|_| "***"))
            .field("login_mode", &self.login_mode)
            .field("manual_login_url", &self.manual_login_url)
            .finish()
    }
}

/// Browser launch options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    #[serde(default)]
    pub headless: bool,

    /// Explicit Chrome binary; auto-detected when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_port: default_debug_port(),
            headless: false,
            chrome_path: None,
        }
    }
}

fn default_debug_port() -> u16 {
    9222
}

/// Fixed delays and timeouts, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingsConfig {
    #[serde(default = "default_login_settle_ms")]
    pub login_settle_ms: u64,

    #[serde(default = "default_post_login_settle_ms")]
    pub post_login_settle_ms: u64,

    #[serde(default = "default_manual_settle_ms")]
    pub manual_settle_ms: u64,

    #[serde(default = "default_list_settle_ms")]
    pub list_settle_ms: u64,

    #[serde(default = "default_upload_timeout_ms")]
    pub upload_timeout_ms: u64,

    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            login_settle_ms: default_login_settle_ms(),
            post_login_settle_ms: default_post_login_settle_ms(),
            manual_settle_ms: default_manual_settle_ms(),
            list_settle_ms: default_list_settle_ms(),
            upload_timeout_ms: default_upload_timeout_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
        }
    }
}

impl TimingsConfig {
    /// All delays zero; used by tests driving a simulated page.
    pub fn immediate() -> Self {
        Self {
            login_settle_ms: 0,
            post_login_settle_ms: 0,
            manual_settle_ms: 0,
            list_settle_ms: 0,
            upload_timeout_ms: default_upload_timeout_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
        }
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn post_login_settle(&self) -> Duration {
        Duration::from_millis(self.post_login_settle_ms)
    }

    pub fn manual_settle(&self) -> Duration {
        Duration::from_millis(self.manual_settle_ms)
    }

    pub fn list_settle(&self) -> Duration {
        Duration::from_millis(self.list_settle_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

fn default_login_settle_ms() -> u64 {
    2500
}

fn default_post_login_settle_ms() -> u64 {
    1000
}

fn default_manual_settle_ms() -> u64 {
    2500
}

fn default_list_settle_ms() -> u64 {
    1000
}

fn default_upload_timeout_ms() -> u64 {
    120_000
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

/// Candidate document naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Appended to a file name once its import is confirmed.
    #[serde(default = "default_consumed_suffix")]
    pub consumed_suffix: String,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            consumed_suffix: default_consumed_suffix(),
        }
    }
}

fn default_extension() -> String {
    ".xml".to_string()
}

fn default_consumed_suffix() -> String {
    ".uploaded".to_string()
}

/// Result list display options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    250
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.exact.base_url, "https://start.exactonline.be");
        assert_eq!(config.exact.topic, "GLTransactions");
        assert!(config.exact.division.is_none());
        assert_eq!(config.credentials.login_mode, LoginMode::Automatic);
        assert_eq!(config.browser.debug_port, 9222);
        assert_eq!(config.timings.upload_timeout_ms, 120_000);
        assert_eq!(config.documents.extension, ".xml");
        assert_eq!(config.documents.consumed_suffix, ".uploaded");
        assert_eq!(config.list.page_size, 250);
    }

    #[test]
    fn test_urls() {
        let exact = ExactConfig {
            base_url: "https://start.exactonline.nl/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            exact.login_url(),
            "https://start.exactonline.nl/docs/Login.aspx?Language=EN"
        );
        assert_eq!(
            exact.upload_url("12345"),
            "https://start.exactonline.nl/docs/XMLUpload.aspx?ui=1&Topic=GLTransactions&_Division_=12345"
        );
        assert_eq!(
            exact.event_url("abc", "12345"),
            "https://start.exactonline.nl/docs/XmlEvent.aspx?ID=abc&_Division_=12345"
        );
    }

    #[test]
    fn test_login_mode_parse() {
        assert_eq!("manual".parse::<LoginMode>().unwrap(), LoginMode::Manual);
        assert_eq!(" Automatic ".parse::<LoginMode>().unwrap(), LoginMode::Automatic);
        assert_eq!("auto".parse::<LoginMode>().unwrap(), LoginMode::Automatic);
        assert!("sso".parse::<LoginMode>().is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = CredentialsConfig {
            username: Some("alice".to_string()),
            password: Some("hunter2".to_string()),
            otp_secret: Some("JBSWY3DPEHPK3PXP".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("JBSWY3DPEHPK3PXP"));
    }

    #[test]
    fn test_immediate_timings() {
        let timings = TimingsConfig::immediate();
        assert_eq!(timings.login_settle(), Duration::ZERO);
        assert_eq!(timings.list_settle(), Duration::ZERO);
        assert_eq!(timings.upload_timeout(), Duration::from_secs(120));
    }
}
