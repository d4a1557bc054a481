//! Locate-and-wait contract and interaction primitives over one render
//! context.
//!
//! Every primitive returns `HarvestResult`; an element that never shows up
//! is the tagged [`HarvestError::NotFound`] outcome, which callers match on
//! to decide between skipping a field and dropping a record. Engine
//! failures map to [`HarvestError::Engine`] and abort the run.

use crate::locator::Locator;
use crate::renderer::{ElementState, RenderContext};
use harvest_catalog::{HarvestError, HarvestResult};
use std::time::{Duration, Instant};

/// Default wait for an element to appear (20 seconds).
pub const DEFAULT_ELEMENT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default polling interval while waiting (250ms).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default navigation timeout (30 seconds).
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// How long and how often to poll for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ELEMENT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What `locate` waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Single probe, no polling.
    Immediate,
    /// Poll until the element is in the DOM.
    Present,
    /// Poll until the element is visible and enabled.
    Clickable,
}

/// An element confirmed by [`Page::locate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub locator: Locator,
    pub state: ElementState,
}

/// The single page context used sequentially by a whole run.
pub struct Page {
    context: Box<dyn RenderContext>,
    policy: WaitPolicy,
    navigation_timeout: Duration,
}

fn engine(e: anyhow::Error) -> HarvestError {
    HarvestError::Engine(format!("{e:#}"))
}

impl Page {
    pub fn new(context: Box<dyn RenderContext>, policy: WaitPolicy) -> Self {
        Self {
            context,
            policy,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Load a URL. Failure is fatal for the run.
    pub async fn navigate(&mut self, url: &str) -> HarvestResult<()> {
        tracing::info!(url, "Opening web page");
        let nav = self
            .context
            .navigate(url, self.navigation_timeout.as_millis() as u64)
            .await
            .map_err(engine)?;
        tracing::debug!(url, final_url = %nav.final_url, load_time_ms = nav.load_time_ms, "Page loaded");
        Ok(())
    }

    /// Find an element, polling until `wait` is satisfied or the policy
    /// timeout elapses.
    pub async fn locate(&self, locator: &Locator, wait: Wait) -> HarvestResult<ElementHandle> {
        let start = Instant::now();
        loop {
            let state = self.context.probe(locator).await.map_err(engine)?;
            let satisfied = match wait {
                Wait::Immediate | Wait::Present => state.is_present(),
                Wait::Clickable => state.is_clickable(),
            };
            if satisfied {
                return Ok(ElementHandle {
                    locator: locator.clone(),
                    state,
                });
            }

            let waited = start.elapsed();
            if wait == Wait::Immediate || waited >= self.policy.timeout {
                return Err(HarvestError::NotFound {
                    locator: locator.to_string(),
                    waited_ms: waited.as_millis() as u64,
                });
            }
            let remaining = self.policy.timeout - waited;
            tokio::time::sleep(self.policy.poll_interval.min(remaining)).await;
        }
    }

    /// Click an optional control. Absence is a valid outcome: it is logged
    /// and reported as `Ok(false)`.
    pub async fn click(&self, locator: &Locator, label: &str) -> HarvestResult<bool> {
        tracing::info!(label, "Clicking the {label} button");
        match self.press(locator).await {
            Ok(()) => Ok(true),
            Err(e @ HarvestError::NotFound { .. }) => {
                tracing::warn!(label, locator = %locator, kind = e.kind(), "No {label} button found");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Click a required control; absence is returned as `NotFound`.
    pub async fn press(&self, locator: &Locator) -> HarvestResult<()> {
        let handle = self.locate(locator, Wait::Clickable).await?;
        if self.context.click(&handle.locator).await.map_err(engine)? {
            Ok(())
        } else {
            // Detached between the probe and the click.
            Err(HarvestError::NotFound {
                locator: locator.to_string(),
                waited_ms: 0,
            })
        }
    }

    /// Rendered text of an element, trimmed.
    pub async fn read_text(&self, locator: &Locator) -> HarvestResult<String> {
        self.read_text_with(locator, Wait::Present).await
    }

    /// [`Page::read_text`] with an explicit wait, e.g. `Wait::Immediate` for
    /// cells of a table that is already rendered.
    pub async fn read_text_with(&self, locator: &Locator, wait: Wait) -> HarvestResult<String> {
        let handle = self.locate(locator, wait).await?;
        match self.context.text(&handle.locator).await.map_err(engine)? {
            Some(text) => Ok(text.trim().to_string()),
            None => Err(HarvestError::NotFound {
                locator: locator.to_string(),
                waited_ms: 0,
            }),
        }
    }

    /// An attribute of an element. A present element without the attribute
    /// is reported as `NotFound` for `{locator}@{attr}`.
    pub async fn read_attribute(&self, locator: &Locator, attr: &str) -> HarvestResult<String> {
        self.read_attribute_with(locator, attr, Wait::Present).await
    }

    pub async fn read_attribute_with(
        &self,
        locator: &Locator,
        attr: &str,
        wait: Wait,
    ) -> HarvestResult<String> {
        let handle = self.locate(locator, wait).await?;
        match self
            .context
            .attribute(&handle.locator, attr)
            .await
            .map_err(engine)?
        {
            Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => Err(HarvestError::NotFound {
                locator: format!("{locator}@{attr}"),
                waited_ms: 0,
            }),
        }
    }

    /// Number of elements matching right now (no waiting).
    pub async fn count(&self, locator: &Locator) -> HarvestResult<usize> {
        self.context.count(locator).await.map_err(engine)
    }

    /// Fixed pause for client-side rendering or download latency.
    pub async fn settle(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    /// Release the underlying context.
    pub async fn close(self) -> anyhow::Result<()> {
        self.context.close().await
    }
}
