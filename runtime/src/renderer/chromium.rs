//! Chromium-based renderer using chromiumoxide.
//!
//! Element operations are implemented by evaluating small scripts in the
//! page: `document.evaluate` for XPath locators and
//! `getElementsByClassName` for class-name locators.

use super::{ElementState, NavigationResult, RenderContext, Renderer};
use crate::locator::{Locator, LocatorKind};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::Mutex;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. HARVEST_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("HARVEST_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.harvest/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".harvest/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".harvest/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".harvest/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".harvest/chromium/chrome-linux64/chrome"),
                home.join(".harvest/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launch options for [`ChromiumRenderer`].
#[derive(Debug, Clone, Default)]
pub struct ChromiumOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// Directory the browser's download manager saves into.
    pub download_dir: Option<PathBuf>,
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    download_dir: Option<PathBuf>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance.
    pub async fn new(options: ChromiumOptions) -> Result<Self> {
        let chrome_path =
            find_chromium().context("Chromium not found. Set HARVEST_CHROMIUM_PATH.")?;
        tracing::info!(path = %chrome_path.display(), headless = options.headless, "Configuring the browser");

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        builder = if options.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let config = builder
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            download_dir: options.download_dir,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        if let Some(dir) = &self.download_dir {
            let params = SetDownloadBehaviorParams::builder()
                .behavior(SetDownloadBehaviorBehavior::Allow)
                .download_path(dir.display().to_string())
                .build()
                .map_err(|e| anyhow::anyhow!("invalid download behavior: {e}"))?;
            page.execute(params)
                .await
                .context("failed to set download directory")?;
        }

        Ok(Box::new(ChromiumContext { page }))
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Closing the browser");
        let mut browser = self.browser.lock().await;
        browser.close().await.context("failed to close the browser")?;
        browser.wait().await.context("browser did not exit")?;
        Ok(())
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
}

impl ChromiumContext {
    async fn eval(&self, script: &str) -> Result<Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}

/// Expression evaluating to the first matching element or `null`.
fn resolve_js(locator: &Locator) -> String {
    let expr = Value::String(locator.expression.clone()).to_string();
    match locator.kind {
        LocatorKind::XPath => format!(
            "document.evaluate({expr}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
        ),
        LocatorKind::ClassName => format!("(document.getElementsByClassName({expr})[0] || null)"),
    }
}

fn count_js(locator: &Locator) -> String {
    let expr = Value::String(locator.expression.clone()).to_string();
    match locator.kind {
        LocatorKind::XPath => format!(
            "document.evaluate({expr}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength"
        ),
        LocatorKind::ClassName => format!("document.getElementsByClassName({expr}).length"),
    }
}

fn probe_js(locator: &Locator) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return null; \
         const r = el.getBoundingClientRect(); \
         return {{ visible: r.width > 0 && r.height > 0 && getComputedStyle(el).visibility !== 'hidden', \
                   enabled: !el.disabled }}; }})()",
        resolve_js(locator)
    )
}

fn text_js(locator: &Locator) -> String {
    format!(
        "(() => {{ const el = {}; return el ? (el.innerText ?? el.textContent) : null; }})()",
        resolve_js(locator)
    )
}

fn attribute_js(locator: &Locator, name: &str) -> String {
    let name = Value::String(name.to_string()).to_string();
    format!(
        "(() => {{ const el = {}; if (!el) return null; const n = {name}; \
         const p = el[n]; return typeof p === 'string' ? p : el.getAttribute(n); }})()",
        resolve_js(locator)
    )
}

fn click_js(locator: &Locator) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return false; \
         el.scrollIntoView({{ block: 'center' }}); el.click(); return true; }})()",
        resolve_js(locator)
    )
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_response)) => {
                if let Err(e) = self.page.wait_for_navigation().await {
                    tracing::debug!(url, error = %e, "Navigation wait failed");
                }

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation to {url} failed: {e}"),
            Err(_) => bail!("navigation to {url} timed out after {timeout_ms}ms"),
        }
    }

    async fn probe(&self, locator: &Locator) -> Result<ElementState> {
        let value = self.eval(&probe_js(locator)).await?;
        if value.is_null() {
            return Ok(ElementState::Absent);
        }
        Ok(ElementState::Present {
            visible: value["visible"].as_bool().unwrap_or(false),
            enabled: value["enabled"].as_bool().unwrap_or(true),
        })
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        let value = self.eval(&count_js(locator)).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        let value = self.eval(&text_js(locator)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let value = self.eval(&attribute_js(locator, name)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&self, locator: &Locator) -> Result<bool> {
        let value = self.eval(&click_js(locator)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let _ = self.page.close().await;
        Ok(())
    }
}
