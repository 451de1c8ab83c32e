//! [`Browser`] backed by a local Chrome.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use exact_import_config::Config;
use exact_import_core::{Browser, BrowserPage, PageError};

use crate::manager::{BrowserManager, BrowserManagerConfig};
use crate::page::CdpPage;

pub struct ChromeBrowser {
    manager: BrowserManager,
    page_timeout: Duration,
}

impl ChromeBrowser {
    pub fn new(config: BrowserManagerConfig, page_timeout: Duration) -> Self {
        Self {
            manager: BrowserManager::new(config),
            page_timeout,
        }
    }

    /// Chrome for one run, with its profile under `profile_dir`.
    pub fn from_config(config: &Config, profile_dir: &Path) -> Self {
        Self::new(
            BrowserManagerConfig::from_config(&config.browser, &config.timings, profile_dir),
            config.timings.navigation_timeout(),
        )
    }

    pub fn manager(&self) -> &BrowserManager {
        &self.manager
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn open_page(&self) -> Result<Arc<dyn BrowserPage>, PageError> {
        let session = self.manager.new_page().await?;
        info!("Opened browser page");
        Ok(Arc::new(CdpPage::new(session, self.page_timeout)))
    }

    async fn close(&self) -> Result<(), PageError> {
        self.manager.shutdown_chrome().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exact_import_config::BrowserConfig;

    #[test]
    fn test_from_config_uses_run_profile() {
        let config = Config {
            browser: BrowserConfig {
                debug_port: 9444,
                headless: true,
                chrome_path: None,
            },
            ..Default::default()
        };

        let browser = ChromeBrowser::from_config(&config, Path::new("/tmp/run/user_data"));

        let manager = browser.manager().config();
        assert_eq!(manager.debug_port, 9444);
        assert!(manager.headless);
        assert_eq!(manager.profile_dir, Path::new("/tmp/run/user_data"));
        assert_eq!(browser.page_timeout, config.timings.navigation_timeout());
    }

    #[tokio::test]
    async fn test_close_before_open_is_harmless() {
        let browser = ChromeBrowser::new(BrowserManagerConfig::new("/tmp/profile"), Duration::from_secs(1));
        assert!(browser.close().await.is_ok());
    }
}
