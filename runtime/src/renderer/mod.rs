//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). Element
//! operations are addressed by [`Locator`]; waiting and fallback policy live
//! one level up in [`crate::page`].

pub mod chromium;
pub mod memory;

use crate::locator::Locator;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// What the engine currently knows about one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementState {
    /// No element matches the locator.
    Absent,
    /// The element is in the DOM.
    Present {
        /// Rendered with a non-empty box.
        visible: bool,
        /// Not disabled.
        enabled: bool,
    },
}

impl ElementState {
    pub fn is_present(&self) -> bool {
        matches!(self, ElementState::Present { .. })
    }

    /// Present, visible, and enabled.
    pub fn is_clickable(&self) -> bool {
        matches!(
            self,
            ElementState::Present {
                visible: true,
                enabled: true
            }
        )
    }
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Single, non-waiting probe of an element.
    async fn probe(&self, locator: &Locator) -> Result<ElementState>;
    /// Number of elements currently matching the locator.
    async fn count(&self, locator: &Locator) -> Result<usize>;
    /// Rendered text of the first match, `None` if absent.
    async fn text(&self, locator: &Locator) -> Result<Option<String>>;
    /// Attribute (or same-named DOM property) of the first match.
    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;
    /// Click the first match. Returns `false` if nothing matched.
    async fn click(&self, locator: &Locator) -> Result<bool>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}
