//! Login state machine.
//!
//! ```text
//! Start ─► NavigateLoginSurface ─┬─► AlreadyAuthenticated ─────────────┐
//!                                ├─► CredentialEntry ─► [TotpChallenge] ┼─► Verifying ─► Authenticated
//!                                └─► ManualWait ───────────────────────┘            └─► Failed
//! ```
//!
//! A stored session is restored before the flow starts and the resulting
//! session is persisted after every successful login, whichever branch
//! produced it.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use exact_import_config::{Config, LoginMode};

use crate::error::ImportError;
use crate::page::BrowserPage;
use crate::store::SessionStore;
use crate::totp::OtpSecret;

const USERNAME_INPUT: &str = "#LoginForm_UserName";
const PASSWORD_INPUT: &str = "#LoginForm_Password";
const OTP_INPUT: &str = "#LoginForm_Input_Key";
const REMEMBER_DEVICE: &str = "#LoginForm_RememberDevice";
const LOGIN_SURFACE: &str = "Login.aspx";
const TOTP_SURFACE: &str = "Totp";

/// States visited by [`SessionManager::authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Start,
    NavigateLoginSurface,
    AlreadyAuthenticated,
    CredentialEntry,
    ManualWait,
    TotpChallenge,
    Verifying,
    Authenticated,
    Failed(String),
}

/// Blocks until an operator says the manual login is done.
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    async fn wait_for_continue(&self, message: &str) -> std::io::Result<()>;
}

/// Prints the message and waits for a line on stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

#[async_trait]
impl OperatorPrompt for StdinPrompt {
    async fn wait_for_continue(&self, message: &str) -> std::io::Result<()> {
        println!("{}", message);
        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        Ok(())
    }
}

/// Produces an authenticated page and keeps the stored session current.
pub struct SessionManager {
    config: Arc<Config>,
    store: Arc<dyn SessionStore>,
    prompt: Arc<dyn OperatorPrompt>,
    otp_code: Option<String>,
    trace: Mutex<Vec<LoginState>>,
}

impl SessionManager {
    pub fn new(config: Arc<Config>, store: Arc<dyn SessionStore>, prompt: Arc<dyn OperatorPrompt>) -> Self {
        Self {
            config,
            store,
            prompt,
            otp_code: None,
            trace: Mutex::new(Vec::new()),
        }
    }

    /// Use this one-time code instead of deriving one from the stored secret.
    pub fn with_otp_code(mut self, code: Option<String>) -> Self {
        self.otp_code = code.filter(|c| !c.trim().is_empty());
        self
    }

    /// States visited so far, across every call to [`authenticate`](Self::authenticate).
    pub fn trace(&self) -> Vec<LoginState> {
        self.trace.lock().clone()
    }

    pub async fn authenticate(&self, page: &dyn BrowserPage) -> Result<(), ImportError> {
        self.transition(LoginState::Start);
        self.restore_session(page).await;

        self.transition(LoginState::NavigateLoginSurface);
        let outcome = match self.config.credentials.login_mode {
            LoginMode::Automatic => self.automatic(page).await,
            LoginMode::Manual => self.manual(page).await,
        };

        if let Err(e) = outcome {
            self.transition(LoginState::Failed(e.to_string()));
            return Err(e);
        }
        self.transition(LoginState::Authenticated);

        let blob = page.export_session().await?;
        self.store.save(&blob).await?;
        info!("Logged in, session saved");
        Ok(())
    }

    async fn restore_session(&self, page: &dyn BrowserPage) {
        match self.store.load().await {
            Ok(Some(blob)) => match page.import_session(&blob).await {
                Ok(()) => debug!("Restored stored session ({} bytes)", blob.len()),
                Err(e) => warn!("Could not restore stored session: {}", e),
            },
            Ok(None) => debug!("No stored session"),
            Err(e) => warn!("Could not read stored session: {}", e),
        }
    }

    async fn automatic(&self, page: &dyn BrowserPage) -> Result<(), ImportError> {
        let timings = &self.config.timings;
        page.goto(&self.config.exact.login_url()).await?;
        // The post-login redirect is not signalled.
        tokio::time::sleep(timings.login_settle()).await;

        let url = page.current_url().await?;
        debug!("Current url {}", url);
        if !url.contains(LOGIN_SURFACE) {
            self.transition(LoginState::AlreadyAuthenticated);
            return Ok(());
        }

        self.transition(LoginState::CredentialEntry);
        let credentials = &self.config.credentials;
        let (Some(username), Some(password)) = (&credentials.username, &credentials.password) else {
            return Err(ImportError::authentication("username and password are required"));
        };
        info!("Logging in as {}", username);

        page.wait_for_selector(USERNAME_INPUT).await?;
        page.type_into(USERNAME_INPUT, username).await?;
        page.press_enter().await?;
        page.wait_for_selector(PASSWORD_INPUT).await?;
        page.type_into(PASSWORD_INPUT, password).await?;
        page.press_enter().await?;
        page.wait_for_navigation(timings.navigation_timeout()).await?;

        if page.current_url().await?.contains(TOTP_SURFACE) {
            self.transition(LoginState::TotpChallenge);
            let code = self.one_time_code()?;
            page.wait_for_selector(OTP_INPUT).await?;
            page.click(REMEMBER_DEVICE).await?;
            page.type_into(OTP_INPUT, &code).await?;
            page.press_enter().await?;
            page.wait_for_navigation(timings.navigation_timeout()).await?;
        }

        self.transition(LoginState::Verifying);
        tokio::time::sleep(timings.post_login_settle()).await;
        if page.current_url().await?.contains(LOGIN_SURFACE) {
            return Err(ImportError::authentication("still on the login page after signing in"));
        }
        Ok(())
    }

    async fn manual(&self, page: &dyn BrowserPage) -> Result<(), ImportError> {
        let Some(login_url) = self.config.credentials.manual_login_url.as_deref() else {
            return Err(ImportError::authentication("no manual login URL configured"));
        };
        page.goto(login_url).await?;
        tokio::time::sleep(self.config.timings.manual_settle()).await;

        if self.on_landing_page(page).await? {
            self.transition(LoginState::AlreadyAuthenticated);
            return Ok(());
        }
        if self.config.browser.headless {
            return Err(ImportError::authentication(
                "manual login needs a visible browser but headless is set",
            ));
        }

        self.transition(LoginState::ManualWait);
        self.prompt
            .wait_for_continue("Complete the login in the browser window, then press Enter to continue")
            .await?;

        self.transition(LoginState::Verifying);
        if !self.on_landing_page(page).await? {
            return Err(ImportError::authentication("landing page not reached after manual login"));
        }
        Ok(())
    }

    /// Explicit code first, then the stored secret.
    fn one_time_code(&self) -> Result<String, ImportError> {
        if let Some(code) = &self.otp_code {
            return Ok(code.trim().to_string());
        }
        let secret = self
            .config
            .credentials
            .otp_secret
            .as_deref()
            .ok_or_else(|| ImportError::authentication("OTP unobtainable: no code given and no secret configured"))?;
        OtpSecret::parse(secret)
            .and_then(|otp| otp.current_code())
            .map_err(|e| ImportError::authentication(format!("OTP unobtainable: {}", e)))
    }

    async fn on_landing_page(&self, page: &dyn BrowserPage) -> Result<bool, ImportError> {
        let url = page.current_url().await?;
        Ok(url.starts_with(self.config.exact.base()) && !url.contains(LOGIN_SURFACE))
    }

    fn transition(&self, state: LoginState) {
        debug!("Login state: {:?}", state);
        self.trace.lock().push(state);
    }
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
