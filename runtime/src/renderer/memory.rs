//! Scripted in-memory rendering engine.
//!
//! Pages are registered per URL as a table of elements keyed by locator
//! expression. Clicking an element that carries a download writes the file
//! into the configured download directory, the way a browser's download
//! manager would. Used to exercise the pipeline without a browser.

use super::{ElementState, NavigationResult, RenderContext};
use crate::locator::Locator;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// A file produced by clicking an element.
#[derive(Debug, Clone)]
pub struct MemoryDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One element on a scripted page.
#[derive(Debug, Clone)]
pub struct MemoryElement {
    pub text: Option<String>,
    pub attributes: HashMap<String, String>,
    pub visible: bool,
    pub enabled: bool,
    pub download: Option<MemoryDownload>,
}

impl Default for MemoryElement {
    fn default() -> Self {
        Self {
            text: None,
            attributes: HashMap::new(),
            visible: true,
            enabled: true,
            download: None,
        }
    }
}

/// A scripted page: elements and explicit match counts.
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    elements: HashMap<String, MemoryElement>,
    counts: HashMap<String, usize>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an element.
    pub fn element(mut self, expression: impl Into<String>, element: MemoryElement) -> Self {
        self.elements.insert(expression.into(), element);
        self
    }

    /// Add a visible element with text.
    pub fn text(self, expression: impl Into<String>, text: impl Into<String>) -> Self {
        self.element(
            expression,
            MemoryElement {
                text: Some(text.into()),
                ..Default::default()
            },
        )
    }

    /// Add a link element with text and `href`.
    pub fn link(
        self,
        expression: impl Into<String>,
        text: impl Into<String>,
        href: impl Into<String>,
    ) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("href".to_string(), href.into());
        self.element(
            expression,
            MemoryElement {
                text: Some(text.into()),
                attributes,
                ..Default::default()
            },
        )
    }

    /// Add a clickable button.
    pub fn button(self, expression: impl Into<String>) -> Self {
        self.element(expression, MemoryElement::default())
    }

    /// Add a button that produces a download when clicked.
    pub fn download_button(
        self,
        expression: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.element(
            expression,
            MemoryElement {
                download: Some(MemoryDownload {
                    file_name: file_name.into(),
                    bytes: bytes.into(),
                }),
                ..Default::default()
            },
        )
    }

    /// Add an element that is in the DOM but not rendered.
    pub fn hidden(self, expression: impl Into<String>) -> Self {
        self.element(
            expression,
            MemoryElement {
                visible: false,
                ..Default::default()
            },
        )
    }

    /// Declare how many elements match an expression (e.g. table rows).
    pub fn count(mut self, expression: impl Into<String>, n: usize) -> Self {
        self.counts.insert(expression.into(), n);
        self
    }
}

#[derive(Debug, Default)]
struct SiteState {
    pages: HashMap<String, MemoryPage>,
    current: Option<String>,
    download_dir: Option<PathBuf>,
    visits: Vec<String>,
    clicks: Vec<String>,
}

/// A set of scripted pages shared by every context created from it.
#[derive(Debug, Clone, Default)]
pub struct MemorySite {
    state: Arc<Mutex<SiteState>>,
}

impl MemorySite {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register (or replace) the page served at `url`.
    pub fn page(&self, url: impl Into<String>, page: MemoryPage) -> &Self {
        self.lock().pages.insert(url.into(), page);
        self
    }

    /// Directory that clicked downloads are written into.
    pub fn download_dir(&self, dir: impl Into<PathBuf>) -> &Self {
        self.lock().download_dir = Some(dir.into());
        self
    }

    /// URLs navigated to, in order.
    pub fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    /// Locator expressions clicked, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    /// Open a context on this site.
    pub fn context(&self) -> MemoryContext {
        MemoryContext { site: self.clone() }
    }

    fn with_element<T>(
        &self,
        locator: &Locator,
        f: impl FnOnce(Option<&MemoryElement>) -> T,
    ) -> T {
        let state = self.lock();
        let element = state
            .current
            .as_ref()
            .and_then(|url| state.pages.get(url))
            .and_then(|page| page.elements.get(&locator.expression));
        f(element)
    }
}

/// A context over a [`MemorySite`].
pub struct MemoryContext {
    site: MemorySite,
}

#[async_trait]
impl RenderContext for MemoryContext {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        let mut state = self.site.lock();
        if !state.pages.contains_key(url) {
            bail!("navigation to {url} failed: no such page");
        }
        state.current = Some(url.to_string());
        state.visits.push(url.to_string());
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 0,
        })
    }

    async fn probe(&self, locator: &Locator) -> Result<ElementState> {
        Ok(self.site.with_element(locator, |el| match el {
            None => ElementState::Absent,
            Some(el) => ElementState::Present {
                visible: el.visible,
                enabled: el.enabled,
            },
        }))
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        let state = self.site.lock();
        let Some(page) = state.current.as_ref().and_then(|url| state.pages.get(url)) else {
            return Ok(0);
        };
        if let Some(n) = page.counts.get(&locator.expression) {
            return Ok(*n);
        }
        Ok(usize::from(page.elements.contains_key(&locator.expression)))
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        Ok(self
            .site
            .with_element(locator, |el| el.and_then(|el| el.text.clone())))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        Ok(self.site.with_element(locator, |el| {
            el.and_then(|el| el.attributes.get(name).cloned())
        }))
    }

    async fn click(&self, locator: &Locator) -> Result<bool> {
        let download = self.site.with_element(locator, |el| {
            el.map(|el| el.download.clone())
        });
        let Some(download) = download else {
            return Ok(false);
        };

        let dir = {
            let mut state = self.site.lock();
            state.clicks.push(locator.expression.clone());
            state.download_dir.clone()
        };
        if let (Some(download), Some(dir)) = (download, dir) {
            std::fs::write(dir.join(&download.file_name), &download.bytes)?;
        }
        Ok(true)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.site.lock().current = None;
        Ok(())
    }
}
