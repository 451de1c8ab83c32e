use super::*;
use crate::store::MemorySessionStore;
use crate::testing::{BASE_URL, FakeErp, FakeOperator, FakePage, MANUAL_URL};
use exact_import_config::{CredentialsConfig, ExactConfig, TimingsConfig};

/// Period large enough that the code never rolls over during a test run.
const FROZEN_SECRET: &str =
    "otpauth://totp/Exact:alice?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&period=4000000000";

fn automatic_config() -> Config {
    Config {
        exact: ExactConfig {
            base_url: BASE_URL.to_string(),
            division: Some("42".to_string()),
            ..Default::default()
        },
        credentials: CredentialsConfig {
            username: Some("alice".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        },
        timings: TimingsConfig::immediate(),
        ..Default::default()
    }
}

fn manual_config(headless: bool) -> Config {
    let mut config = automatic_config();
    config.credentials = CredentialsConfig {
        login_mode: LoginMode::Manual,
        manual_login_url: Some(MANUAL_URL.to_string()),
        ..Default::default()
    };
    config.browser.headless = headless;
    config
}

struct Harness {
    erp: Arc<FakeErp>,
    page: FakePage,
    store: Arc<MemorySessionStore>,
    manager: SessionManager,
}

fn harness(config: Config, store: MemorySessionStore) -> Harness {
    let erp = FakeErp::new("alice", "secret");
    let page = FakePage::new(erp.clone());
    let store = Arc::new(store);
    let manager = SessionManager::new(
        Arc::new(config),
        store.clone(),
        Arc::new(FakeOperator::new(erp.clone())),
    );
    Harness {
        erp,
        page,
        store,
        manager,
    }
}

fn frozen_code() -> String {
    OtpSecret::parse(FROZEN_SECRET).unwrap().code_at(0).unwrap()
}

#[tokio::test]
async fn test_password_login_without_second_factor() {
    let h = harness(automatic_config(), MemorySessionStore::new());

    h.manager.authenticate(&h.page).await.unwrap();

    assert!(h.page.is_authenticated());
    assert_eq!(
        h.manager.trace(),
        vec![
            LoginState::Start,
            LoginState::NavigateLoginSurface,
            LoginState::CredentialEntry,
            LoginState::Verifying,
            LoginState::Authenticated,
        ]
    );
    assert_eq!(h.store.save_count(), 1);
    assert_eq!(h.store.blob().unwrap(), b"session:valid");
}

#[tokio::test]
async fn test_totp_from_stored_secret() {
    let mut config = automatic_config();
    config.credentials.otp_secret = Some(FROZEN_SECRET.to_string());
    let h = harness(config, MemorySessionStore::new());
    h.erp.require_totp(&frozen_code());

    h.manager.authenticate(&h.page).await.unwrap();

    assert!(h.manager.trace().contains(&LoginState::TotpChallenge));
    assert!(h.erp.remembered_device());
    assert_eq!(h.store.save_count(), 1);
}

#[tokio::test]
async fn test_explicit_code_takes_priority_over_secret() {
    let mut config = automatic_config();
    config.credentials.otp_secret = Some(FROZEN_SECRET.to_string());
    let h = harness(config, MemorySessionStore::new());
    let explicit = if frozen_code() == "000000" { "111111" } else { "000000" };
    h.erp.require_totp(explicit);

    let manager = h.manager.with_otp_code(Some(explicit.to_string()));
    manager.authenticate(&h.page).await.unwrap();

    assert!(h.page.is_authenticated());
}

#[tokio::test]
async fn test_totp_without_code_or_secret_fails() {
    let h = harness(automatic_config(), MemorySessionStore::new());
    h.erp.require_totp("123456");

    let err = h.manager.authenticate(&h.page).await.unwrap_err();

    assert!(matches!(err, ImportError::Authentication { ref reason } if reason.contains("OTP unobtainable")));
    assert!(matches!(h.manager.trace().last(), Some(LoginState::Failed(_))));
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_invalid_secret_fails() {
    let mut config = automatic_config();
    config.credentials.otp_secret = Some("not base32!".to_string());
    let h = harness(config, MemorySessionStore::new());
    h.erp.require_totp("123456");

    let err = h.manager.authenticate(&h.page).await.unwrap_err();
    assert!(matches!(err, ImportError::Authentication { ref reason } if reason.contains("OTP unobtainable")));
}

#[tokio::test]
async fn test_wrong_code_leaves_login_surface() {
    let h = harness(automatic_config(), MemorySessionStore::new());
    h.erp.require_totp("123456");

    let manager = h.manager.with_otp_code(Some("654321".to_string()));
    let err = manager.authenticate(&h.page).await.unwrap_err();

    assert!(matches!(err, ImportError::Authentication { ref reason } if reason.contains("still on the login page")));
}

#[tokio::test]
async fn test_wrong_password_fails() {
    let mut config = automatic_config();
    config.credentials.password = Some("wrong".to_string());
    let h = harness(config, MemorySessionStore::new());

    let err = h.manager.authenticate(&h.page).await.unwrap_err();

    assert!(matches!(err, ImportError::Authentication { .. }));
    assert!(!h.page.is_authenticated());
    assert!(h.store.blob().is_none());
}

#[tokio::test]
async fn test_missing_credentials_fail() {
    let mut config = automatic_config();
    config.credentials.password = None;
    let h = harness(config, MemorySessionStore::new());

    let err = h.manager.authenticate(&h.page).await.unwrap_err();
    assert!(matches!(err, ImportError::Authentication { ref reason } if reason.contains("password")));
}

#[tokio::test]
async fn test_restored_session_skips_credentials_and_is_persisted_again() {
    let h = harness(automatic_config(), MemorySessionStore::with_blob(&b"session:valid"[..]));

    h.manager.authenticate(&h.page).await.unwrap();

    assert_eq!(
        h.manager.trace(),
        vec![
            LoginState::Start,
            LoginState::NavigateLoginSurface,
            LoginState::AlreadyAuthenticated,
            LoginState::Authenticated,
        ]
    );
    assert_eq!(h.store.save_count(), 1);
}

#[tokio::test]
async fn test_stale_session_falls_back_to_credentials() {
    let h = harness(automatic_config(), MemorySessionStore::with_blob(&b"session:expired"[..]));

    h.manager.authenticate(&h.page).await.unwrap();

    assert!(h.manager.trace().contains(&LoginState::CredentialEntry));
    assert_eq!(h.store.blob().unwrap(), b"session:valid");
}

#[tokio::test]
async fn test_manual_login_headless_fails_without_prompting() {
    let h = harness(manual_config(true), MemorySessionStore::new());
    h.erp.operator_completes_login(true);

    let err = h.manager.authenticate(&h.page).await.unwrap_err();

    assert!(matches!(err, ImportError::Authentication { ref reason } if reason.contains("headless")));
    assert!(!h.erp.operator_signalled());
    assert!(!h.manager.trace().contains(&LoginState::ManualWait));
}

#[tokio::test]
async fn test_manual_login_waits_for_operator() {
    let h = harness(manual_config(false), MemorySessionStore::new());
    h.erp.operator_completes_login(true);

    h.manager.authenticate(&h.page).await.unwrap();

    assert!(h.erp.operator_signalled());
    assert_eq!(h.erp.visited(), vec![MANUAL_URL.to_string()]);
    assert!(h.manager.trace().contains(&LoginState::ManualWait));
    assert_eq!(h.store.save_count(), 1);
}

#[tokio::test]
async fn test_manual_login_not_completed_fails() {
    let h = harness(manual_config(false), MemorySessionStore::new());
    h.erp.operator_completes_login(false);

    let err = h.manager.authenticate(&h.page).await.unwrap_err();

    assert!(h.erp.operator_signalled());
    assert!(matches!(err, ImportError::Authentication { ref reason } if reason.contains("landing page")));
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_manual_login_headless_with_restored_session() {
    let h = harness(manual_config(true), MemorySessionStore::with_blob(&b"session:valid"[..]));

    h.manager.authenticate(&h.page).await.unwrap();

    assert!(h.manager.trace().contains(&LoginState::AlreadyAuthenticated));
    assert!(!h.erp.operator_signalled());
    assert_eq!(h.store.save_count(), 1);
}
