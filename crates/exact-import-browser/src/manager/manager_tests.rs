use std::path::Path;

use super::*;
use exact_import_config::{BrowserConfig, TimingsConfig};
use exact_import_core::PageError;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn test_config_from_settings() {
    let browser = BrowserConfig {
        debug_port: 9333,
        headless: true,
        chrome_path: Some("/opt/chrome/chrome".into()),
    };
    let config = BrowserManagerConfig::from_config(&browser, &TimingsConfig::default(), Path::new("/tmp/run/user_data"));

    assert_eq!(config.debug_port, 9333);
    assert!(config.headless);
    assert_eq!(config.profile_dir, Path::new("/tmp/run/user_data"));
    assert_eq!(config.call_timeout, TimingsConfig::default().navigation_timeout());
    assert_eq!(config.endpoint(), "http://127.0.0.1:9333");
}

#[test]
fn test_launch_args() {
    let mut config = BrowserManagerConfig::new("/tmp/profile");
    let args = config.launch_args();
    assert_eq!(args[0], "--remote-debugging-port=9222");
    assert_eq!(args[1], "--user-data-dir=/tmp/profile");
    assert!(args.contains(&"--no-first-run".to_string()));
    assert!(!args.iter().any(|a| a.starts_with("--headless")));

    config.headless = true;
    assert_eq!(config.launch_args().last().unwrap(), "--headless=new");
}

#[test]
fn test_browser_error_display() {
    let err = BrowserError::LaunchFailed("permission denied".to_string());
    assert_eq!(err.to_string(), "Failed to launch Chrome: permission denied");

    let err = BrowserError::from(crate::cdp::CdpError::SessionClosed);
    assert_eq!(err.to_string(), "Session closed");
}

#[test]
fn test_browser_error_to_page_error() {
    assert!(PageError::from(BrowserError::NotConnected).is_transport());
    assert!(PageError::from(BrowserError::Cdp(crate::cdp::CdpError::Timeout("x".into()))).is_transport());
    assert!(!PageError::from(BrowserError::ChromeNotFound).is_transport());
}

#[tokio::test]
async fn test_close_without_connect() {
    let manager = BrowserManager::new(BrowserManagerConfig::new("/tmp/profile"));
    assert!(manager.close().await.is_ok());
    assert!(manager.shutdown_chrome().await.is_ok());
    assert_eq!(manager.page_count().await, 0);
}

#[tokio::test]
async fn test_launch_with_missing_binary_fails() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut config = BrowserManagerConfig::new(temp.path().join("profile"));
    config.debug_port = free_port();
    config.chrome_path = Some(temp.path().join("no-such-chrome"));
    let manager = BrowserManager::new(config);

    let err = manager.connect().await.unwrap_err();

    assert!(matches!(err, BrowserError::LaunchFailed(_)));
    assert!(temp.path().join("profile").exists());
}
