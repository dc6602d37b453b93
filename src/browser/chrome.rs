use crate::core::{BrowserTrait, Config};
use crate::errors::{InspectorError, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

/// Chrome browser implementation
#[derive(Default)]
pub struct ChromeBrowser {
    browser: Option<Browser>,
}

impl ChromeBrowser {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BrowserTrait for ChromeBrowser {
    type TabHandle = Arc<Tab>;

    async fn launch(&mut self, config: &Config) -> Result<()> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.browser.viewport.width, config.browser.viewport.height
        );
        let scale_arg = format!(
            "--force-device-scale-factor={}",
            config.browser.viewport.device_scale_factor
        );

        let user_agent_arg = config
            .browser
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
            OsStr::new(&scale_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        if config.browser.disable_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }

        // Add custom args
        for arg in &config.browser.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.browser.headless)
            .idle_browser_timeout(Duration::from_millis(config.browser.timeout_ms.max(1)) * 10)
            .args(args)
            .build()
            .map_err(|e| InspectorError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| InspectorError::LaunchFailed(e.to_string()))?;

        self.browser = Some(browser);
        Ok(())
    }

    async fn new_tab(&self) -> Result<Self::TabHandle> {
        let browser = self
            .browser
            .as_ref()
            .ok_or(InspectorError::BrowserNotLaunched)?;

        browser
            .new_tab()
            .map_err(|e| InspectorError::TabCreationFailed(e.to_string()))
    }

    async fn navigate(&self, tab: &Self::TabHandle, url: &str) -> Result<()> {
        tab.navigate_to(url)
            .map_err(|e| InspectorError::NavigationFailed(e.to_string()))?;

        tab.wait_until_navigated()
            .map_err(|e| InspectorError::NavigationFailed(e.to_string()))?;

        Ok(())
    }

    async fn execute_script(&self, tab: &Self::TabHandle, script: &str) -> Result<Value> {
        let result = tab
            .evaluate(script, false)
            .map_err(|e| InspectorError::JavaScriptFailed(e.to_string()))?;

        Ok(result.value.unwrap_or(Value::Null))
    }

    async fn get_url(&self, tab: &Self::TabHandle) -> Result<String> {
        Ok(tab.get_url())
    }

    async fn get_title(&self, tab: &Self::TabHandle) -> Result<String> {
        let result = self.execute_script(tab, "document.title").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        self.browser = None;
        Ok(())
    }
}
