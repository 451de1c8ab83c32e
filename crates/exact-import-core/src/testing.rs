//! Simulated Exact Online for exercising the workflow without a browser.
//!
//! [`FakeErp`] plays the server: accepted credentials, second-factor policy,
//! per-document import results and injected transport faults. Each
//! [`FakeBrowser::open_page`] returns a fresh [`FakePage`] (a new browser
//! process, so no cookies) talking to the same server.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::error::PageError;
use crate::extractor::READ_TABLE_SCRIPT;
use crate::login::OperatorPrompt;
use crate::page::{Browser, BrowserPage};

pub const BASE_URL: &str = "https://erp.test";
pub const PORTAL_URL: &str = "https://erp.test/docs/MenuPortal.aspx";
pub const TOTP_URL: &str = "https://erp.test/docs/LoginTotp.aspx";
pub const MANUAL_URL: &str = "https://sso.test/start";
const VALID_SESSION: &[u8] = b"session:valid";
const ANONYMOUS_SESSION: &[u8] = b"session:anonymous";

/// A rendered result cell.
#[derive(Debug, Clone)]
pub struct FakeCell {
    pub text: String,
    pub attachment_id: Option<String>,
}

impl FakeCell {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            attachment_id: None,
        }
    }

    pub fn attachment(label: &str, attachment_id: &str) -> Self {
        Self {
            text: label.to_string(),
            attachment_id: Some(attachment_id.to_string()),
        }
    }
}

pub fn text_row(cells: &[&str]) -> Vec<FakeCell> {
    cells.iter().map(|c| FakeCell::text(c)).collect()
}

/// Escaped event payload as served by the detail endpoint.
pub fn event_payload(journal: &str, entry: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?><html><body>&lt;eExact&gt;&lt;GLTransactions&gt;&lt;GLTransaction entry=\"{}\"&gt;&lt;Journal code=\"{}\"/&gt;&lt;/GLTransaction&gt;&lt;/GLTransactions&gt;&lt;/eExact&gt;</body></html>",
        entry, journal
    )
}

#[derive(Default)]
struct ErpState {
    username: String,
    password: String,
    totp_code: Option<String>,
    operator_completes_login: bool,
    operator_signalled: bool,
    /// Rendered (newest-first) result rows per uploaded file name.
    results: HashMap<String, Vec<Vec<FakeCell>>>,
    payloads: HashMap<String, String>,
    upload_timeouts: usize,
    file_timeouts: HashMap<String, usize>,
    list_failures: usize,
    list_stalls: usize,
    uploads: Vec<String>,
    fetched: Vec<String>,
    visited: Vec<String>,
    screenshots: usize,
    remember_device: bool,
}

/// Server side of the simulation.
#[derive(Default)]
pub struct FakeErp {
    state: Mutex<ErpState>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeErp {
    pub fn new(username: &str, password: &str) -> Arc<Self> {
        let erp = Self::default();
        {
            let mut state = erp.state.lock();
            state.username = username.to_string();
            state.password = password.to_string();
        }
        Arc::new(erp)
    }

    /// Require this code on the second-factor page.
    pub fn require_totp(&self, code: &str) {
        self.state.lock().totp_code = Some(code.to_string());
    }

    /// Whether an operator signal on the manual page completes the login.
    pub fn operator_completes_login(&self, completes: bool) {
        self.state.lock().operator_completes_login = completes;
    }

    pub fn set_result(&self, file_name: &str, rendered_rows: Vec<Vec<FakeCell>>) {
        self.state.lock().results.insert(file_name.to_string(), rendered_rows);
    }

    pub fn set_payload(&self, attachment_id: &str, response: impl Into<String>) {
        self.state
            .lock()
            .payloads
            .insert(attachment_id.to_string(), response.into());
    }

    /// The next `n` import submissions never confirm.
    pub fn fail_uploads(&self, n: usize) {
        self.state.lock().upload_timeouts = n;
    }

    /// The next `n` imports of `file_name` never confirm.
    pub fn fail_upload_of(&self, file_name: &str, n: usize) {
        self.state.lock().file_timeouts.insert(file_name.to_string(), n);
    }

    /// The next `n` list refreshes fail with a script error.
    pub fn fail_list_refresh(&self, n: usize) {
        self.state.lock().list_failures = n;
    }

    /// The next `n` list refreshes re-render in place without navigating.
    pub fn stall_list_refresh(&self, n: usize) {
        self.state.lock().list_stalls = n;
    }

    /// File names whose import was confirmed, in order.
    pub fn uploads(&self) -> Vec<String> {
        self.state.lock().uploads.clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.state.lock().fetched.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().visited.clone()
    }

    pub fn screenshots(&self) -> usize {
        self.state.lock().screenshots
    }

    pub fn remembered_device(&self) -> bool {
        self.state.lock().remember_device
    }

    pub fn operator_signalled(&self) -> bool {
        self.state.lock().operator_signalled
    }

    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Navigation {
    #[default]
    Idle,
    Pending,
    Hung,
}

#[derive(Default)]
struct PageState {
    url: String,
    authenticated: bool,
    focused: String,
    fields: HashMap<String, String>,
    attached: Option<String>,
    last_result: Vec<Vec<FakeCell>>,
    navigation: Navigation,
}

/// Client side of the simulation.
pub struct FakePage {
    erp: Arc<FakeErp>,
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new(erp: Arc<FakeErp>) -> Self {
        Self {
            erp,
            state: Mutex::new(PageState {
                url: "about:blank".to_string(),
                ..Default::default()
            }),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().authenticated
    }

    /// Render `rows` (newest first) as the current result list.
    pub fn show_result(&self, rows: Vec<Vec<FakeCell>>) {
        self.state.lock().last_result = rows;
    }

    fn submit_credentials(&self, page: &mut PageState) {
        let erp = self.erp.state.lock();
        let user_ok = page.fields.get("#LoginForm_UserName") == Some(&erp.username);
        let pass_ok = page.fields.get("#LoginForm_Password") == Some(&erp.password);
        page.navigation = Navigation::Pending;
        if !(user_ok && pass_ok) {
            return;
        }
        if erp.totp_code.is_some() {
            page.url = TOTP_URL.to_string();
        } else {
            page.authenticated = true;
            page.url = PORTAL_URL.to_string();
        }
    }

    fn submit_totp(&self, page: &mut PageState) {
        let erp = self.erp.state.lock();
        page.navigation = Navigation::Pending;
        if page.fields.get("#LoginForm_Input_Key") == erp.totp_code.as_ref() {
            page.authenticated = true;
            page.url = PORTAL_URL.to_string();
        } else {
            page.url = format!("{}/docs/Login.aspx?Language=EN", BASE_URL);
        }
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str) -> Result<(), PageError> {
        self.erp.state.lock().visited.push(url.to_string());
        let mut page = self.state.lock();
        page.navigation = Navigation::Idle;
        page.url = if (url.contains("Login.aspx") || url == MANUAL_URL) && page.authenticated {
            PORTAL_URL.to_string()
        } else if url.starts_with(BASE_URL) && !url.contains("Login.aspx") && !page.authenticated {
            format!("{}/docs/Login.aspx?ReturnUrl=x", BASE_URL)
        } else {
            url.to_string()
        };
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let mut page = self.state.lock();
        let erp = self.erp.state.lock();
        if page.url == MANUAL_URL && erp.operator_signalled && erp.operator_completes_login {
            page.authenticated = true;
            page.url = PORTAL_URL.to_string();
        }
        Ok(page.url.clone())
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<(), PageError> {
        let page = self.state.lock();
        let present = match selector {
            "#LoginForm_UserName" | "#LoginForm_Password" => page.url.contains("Login.aspx"),
            "#LoginForm_Input_Key" | "#LoginForm_RememberDevice" => page.url == TOTP_URL,
            _ => true,
        };
        if present {
            Ok(())
        } else {
            Err(PageError::Timeout(format!("waiting for {}", selector)))
        }
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), PageError> {
        let mut page = self.state.lock();
        page.focused = selector.to_string();
        page.fields.insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), PageError> {
        let mut page = self.state.lock();
        match page.focused.as_str() {
            "#LoginForm_Password" => self.submit_credentials(&mut page),
            "#LoginForm_Input_Key" => self.submit_totp(&mut page),
            _ => {}
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        let mut page = self.state.lock();
        let mut erp = self.erp.state.lock();
        match selector {
            "#LoginForm_RememberDevice" => erp.remember_device = true,
            "#btnImport" => {
                let file = page
                    .attached
                    .clone()
                    .ok_or_else(|| PageError::Script("no file attached".to_string()))?;
                let file_timeouts = erp.file_timeouts.get(&file).copied().unwrap_or(0);
                if erp.upload_timeouts > 0 {
                    erp.upload_timeouts -= 1;
                    page.navigation = Navigation::Hung;
                } else if file_timeouts > 0 {
                    erp.file_timeouts.insert(file, file_timeouts - 1);
                    page.navigation = Navigation::Hung;
                } else {
                    page.last_result = erp.results.get(&file).cloned().unwrap_or_default();
                    erp.uploads.push(file);
                    page.navigation = Navigation::Pending;
                }
            }
            "#List_Show" => {
                if erp.list_failures > 0 {
                    erp.list_failures -= 1;
                    return Err(PageError::Script("list refresh failed".to_string()));
                }
                if erp.list_stalls > 0 {
                    erp.list_stalls -= 1;
                    page.navigation = Navigation::Hung;
                } else {
                    page.navigation = Navigation::Pending;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<(), PageError> {
        let mut page = self.state.lock();
        match std::mem::take(&mut page.navigation) {
            Navigation::Hung => Err(PageError::Timeout("Navigation timeout".to_string())),
            Navigation::Idle | Navigation::Pending => Ok(()),
        }
    }

    async fn set_input_files(&self, _selector: &str, path: &Path) -> Result<(), PageError> {
        if !path.exists() {
            return Err(PageError::Other(format!("{:?} does not exist", path)));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.state.lock().attached = Some(name);
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, PageError> {
        if script == READ_TABLE_SCRIPT {
            let page = self.state.lock();
            let rows: Vec<Value> = page
                .last_result
                .iter()
                .map(|row| {
                    Value::Array(
                        row.iter()
                            .map(|cell| {
                                let href = cell.attachment_id.as_ref().map(|id| {
                                    format!(
                                        "{}/docs/SysAttachmentView.aspx?AttachmentID={}&_Division_=42",
                                        BASE_URL, id
                                    )
                                });
                                json!({ "text": cell.text, "href": href })
                            })
                            .collect(),
                    )
                })
                .collect();
            return Ok(Value::Array(rows));
        }
        if script.contains("List_ps") {
            return Ok(Value::Bool(true));
        }
        Ok(Value::Null)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, PageError> {
        let current = self.erp.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.erp.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.erp.in_flight.fetch_sub(1, Ordering::SeqCst);

        let id = url::Url::parse(url)
            .ok()
            .and_then(|u| {
                u.query_pairs()
                    .find(|(k, _)| k == "ID")
                    .map(|(_, v)| v.into_owned())
            })
            .unwrap_or_default();
        let mut erp = self.erp.state.lock();
        erp.fetched.push(id.clone());
        erp.payloads
            .get(&id)
            .cloned()
            .ok_or_else(|| PageError::Other(format!("404 for {}", url)))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, PageError> {
        self.erp.state.lock().screenshots += 1;
        Ok(b"\x89PNG".to_vec())
    }

    async fn export_session(&self) -> Result<Vec<u8>, PageError> {
        Ok(if self.state.lock().authenticated {
            VALID_SESSION.to_vec()
        } else {
            ANONYMOUS_SESSION.to_vec()
        })
    }

    async fn import_session(&self, blob: &[u8]) -> Result<(), PageError> {
        if blob == VALID_SESSION {
            self.state.lock().authenticated = true;
        }
        Ok(())
    }
}

/// Browser handing out [`FakePage`]s against one [`FakeErp`].
pub struct FakeBrowser {
    erp: Arc<FakeErp>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl FakeBrowser {
    pub fn new(erp: Arc<FakeErp>) -> Self {
        Self {
            erp,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    pub fn pages_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn times_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn open_page(&self) -> Result<Arc<dyn BrowserPage>, PageError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakePage::new(self.erp.clone())))
    }

    async fn close(&self) -> Result<(), PageError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Operator stand-in: records the signal, never blocks.
pub struct FakeOperator {
    erp: Arc<FakeErp>,
}

impl FakeOperator {
    pub fn new(erp: Arc<FakeErp>) -> Self {
        Self { erp }
    }
}

#[async_trait]
impl OperatorPrompt for FakeOperator {
    async fn wait_for_continue(&self, _message: &str) -> std::io::Result<()> {
        self.erp.state.lock().operator_signalled = true;
        Ok(())
    }
}
