//! Per-provider harvesting strategies.
//!
//! A provider fills three slots: dismiss the entry banners, extract the
//! catalog, and acquire the holdings files. Everything else is shared.

pub mod ishares;
pub mod vanguard;

use crate::acquisition::AcquisitionReport;
use crate::config::Timing;
use crate::locator::Locator;
use crate::page::Page;
use async_trait::async_trait;
use harvest_catalog::{CatalogSnapshot, HarvestResult};
use std::path::PathBuf;
use std::time::Duration;

pub use ishares::IShares;
pub use vanguard::Vanguard;

/// Cookie banner shared by both providers' sites.
pub const COOKIE_REJECT: &str = r#"//*[@id="onetrust-reject-all-handler"]"#;

/// Where and how holdings files are acquired for one run.
#[derive(Debug, Clone)]
pub struct AcquisitionContext {
    /// Run directory; also the browser's download directory.
    pub dir: PathBuf,
    pub http_timeout: Duration,
    pub timing: Timing,
}

/// A fund provider's harvesting strategy.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short name, used in paths and logs.
    fn name(&self) -> &'static str;

    /// The catalog listing page every run starts from.
    fn catalog_url(&self) -> &'static str;

    /// Dismiss cookie and investor-profile banners. Missing banners are fine.
    async fn dismiss_entry_banners(&self, page: &mut Page) -> HarvestResult<()>;

    /// Read the listing (and detail pages, if any) into a snapshot.
    async fn extract_catalog(&self, page: &mut Page, timing: &Timing)
        -> HarvestResult<CatalogSnapshot>;

    /// Materialise every record's holdings file in the run directory.
    async fn acquire_files(
        &self,
        page: &mut Page,
        snapshot: &CatalogSnapshot,
        ctx: &AcquisitionContext,
    ) -> HarvestResult<AcquisitionReport>;
}

/// Click each banner control in turn, tolerating absent ones.
pub(crate) async fn dismiss_banners(
    page: &Page,
    banners: &[(&str, &str)],
) -> HarvestResult<usize> {
    let mut dismissed = 0;
    for (label, xpath) in banners {
        if page.click(&Locator::xpath(*xpath), label).await? {
            dismissed += 1;
        }
    }
    Ok(dismissed)
}

/// Every registered provider.
pub fn all() -> Vec<Box<dyn Provider>> {
    vec![Box::new(IShares), Box::new(Vanguard)]
}

/// Look up a provider by name (case-insensitive).
pub fn by_name(name: &str) -> Option<Box<dyn Provider>> {
    all()
        .into_iter()
        .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
}

/// Comma-separated provider names, for error messages.
pub fn names() -> String {
    all().iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
}
