use crate::{browser::config::{ConnectionOptions, LaunchOptions},
            dom::DomTree,
            error::{InspectorError, Result}};
use headless_chrome::{Browser, Tab};
use std::{ffi::OsStr, sync::Arc, time::Duration};

/// Chrome/Chromium instance used to capture documents for inspection
pub struct BrowserSession {
    browser: Browser,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Pages behave differently when they detect automation
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // Inspections are interactive and may sit idle for a long time
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.path = options.chrome_path;
        launch_opts.user_data_dir = options.user_data_dir;
        launch_opts.sandbox = options.sandbox;

        log::debug!(
            "Launching browser (headless: {}, {}x{})",
            options.headless,
            options.window_width,
            options.window_height
        );
        let browser = Browser::new(launch_opts).map_err(|e| InspectorError::LaunchFailed(e.to_string()))?;

        browser
            .new_tab()
            .map_err(|e| InspectorError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self { browser })
    }

    /// Connect to an existing browser instance via its DevTools WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        log::debug!("Connecting to browser at {}", options.ws_url);
        let browser = Browser::connect_with_timeout(options.ws_url, Duration::from_millis(options.timeout))
            .map_err(|e| InspectorError::ConnectionFailed(e.to_string()))?;

        Ok(Self { browser })
    }

    /// Get all tabs
    pub fn tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| InspectorError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// The tab being inspected: the visible one when it can be told apart, else the first
    pub fn tab(&self) -> Result<Arc<Tab>> {
        let tabs = self.tabs()?;

        for tab in &tabs {
            match tab.evaluate("document.visibilityState === 'visible'", false) {
                Ok(remote_object) => {
                    if remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                        return Ok(tab.clone());
                    }
                }
                Err(e) => log::debug!("Failed to check tab visibility: {}", e),
            }
        }

        tabs.into_iter()
            .next()
            .ok_or_else(|| InspectorError::TabOperationFailed("No open tab".to_string()))
    }

    /// Navigate the inspected tab and wait for the page to load
    pub fn navigate(&self, url: &str) -> Result<()> {
        let tab = self.tab()?;
        tab.navigate_to(url)
            .map_err(|e| InspectorError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;
        tab.wait_until_navigated()
            .map_err(|e| InspectorError::NavigationFailed(format!("Navigation timeout: {}", e)))?;

        Ok(())
    }

    /// URL of the inspected tab
    pub fn current_url(&self) -> Result<String> {
        Ok(self.tab()?.get_url())
    }

    /// Snapshot the inspected tab into a document tree
    pub fn extract_document(&self) -> Result<DomTree> {
        let tree = DomTree::from_tab(&self.tab()?)?;
        log::debug!("Extracted {} elements", tree.count_elements());
        Ok(tree)
    }

    /// Get the underlying Browser instance
    pub fn browser(&self) -> &Browser {
        &self.browser
    }
}
