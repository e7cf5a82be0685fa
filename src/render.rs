//! Headless page rendering behind an injectable capability.
//!
//! ACM landing pages inject the abstract with scripts, so a plain GET never
//! sees it. The `PageRenderer` trait is the seam: production uses a headless
//! Chromium session, tests substitute stubs without launching anything.

use crate::error::{DigestError, Result};
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Spoofed desktop user-agent for rendered publisher pages
const RENDER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36 Edg/141.0.0.0";

/// Navigation attempts per render call
const NAV_ATTEMPTS: u32 = 3;

/// Wait between navigation attempts
const NAV_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Per-attempt navigation timeout
const NAV_TIMEOUT: Duration = Duration::from_secs(15);

/// Settle wait after navigation for script-injected content
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Renders a URL and returns the final HTML after scripts have run.
pub trait PageRenderer: Send + Sync {
    /// Navigate to `url` and return the rendered page HTML.
    ///
    /// Blocking: callers on the async runtime must wrap invocations in
    /// `tokio::task::spawn_blocking`.
    fn render(&self, url: &str) -> Result<String>;
}

/// `PageRenderer` backed by a headless Chromium session.
///
/// A fresh browser is launched and torn down on every call; sessions are
/// never reused across papers. Incognito keeps publisher cookies from
/// leaking between records.
pub struct ChromiumRenderer {
    browser_path: Option<PathBuf>,
}

impl ChromiumRenderer {
    /// Create a renderer that auto-detects the browser binary.
    pub fn new() -> Self {
        Self { browser_path: None }
    }

    /// Use a specific browser binary instead of auto-detection.
    pub fn with_browser_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.browser_path = Some(path.into());
        self
    }

    fn launch(&self) -> Result<Browser> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .path(self.browser_path.clone())
            .args(vec![OsStr::new("--incognito"), OsStr::new("--disable-gpu")])
            .build()
            .map_err(|e| DigestError::Render(format!("browser launch options: {}", e)))?;
        Browser::new(options).map_err(|e| DigestError::Render(format!("browser launch: {}", e)))
    }

    fn navigate(&self, browser: &Browser, url: &str) -> Result<String> {
        let tab = browser.new_tab().map_err(render_err)?;
        tab.set_user_agent(RENDER_USER_AGENT, None, None)
            .map_err(render_err)?;
        tab.set_default_timeout(NAV_TIMEOUT);
        tab.navigate_to(url).map_err(render_err)?;
        tab.wait_until_navigated().map_err(render_err)?;
        // The abstract block appears shortly after the load event
        std::thread::sleep(SETTLE_DELAY);
        tab.get_content().map_err(render_err)
    }
}

impl Default for ChromiumRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer for ChromiumRenderer {
    fn render(&self, url: &str) -> Result<String> {
        let browser = self.launch()?;

        let mut last_err = None;
        for attempt in 1..=NAV_ATTEMPTS {
            match self.navigate(&browser, url) {
                Ok(html) => return Ok(html),
                Err(e) => {
                    warn!(url, attempt, error = %e, "Navigation failed");
                    last_err = Some(e);
                    if attempt < NAV_ATTEMPTS {
                        std::thread::sleep(NAV_RETRY_DELAY);
                    }
                }
            }
        }

        // Browser drops here, tearing the headless session down with it
        Err(last_err.unwrap_or_else(|| DigestError::Render("navigation failed".to_string())))
    }
}

fn render_err(e: anyhow::Error) -> DigestError {
    DigestError::Render(e.to_string())
}
