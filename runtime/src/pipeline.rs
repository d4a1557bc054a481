//! One harvest run: catalog page, banners, extraction, snapshot, files.

use crate::acquisition::AcquisitionReport;
use crate::config::HarvestConfig;
use crate::page::Page;
use crate::providers::{AcquisitionContext, Provider};
use harvest_catalog::{CatalogSnapshot, CatalogStore, HarvestResult};
use serde::Serialize;
use std::path::PathBuf;
use tracing::Instrument;

/// Switches for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Reuse the stored snapshot for this date instead of re-extracting.
    pub resume: bool,
    /// Stop after the snapshot is saved.
    pub skip_files: bool,
}

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub provider: String,
    pub run_dir: PathBuf,
    pub records: usize,
    pub resumed: bool,
    pub acquisition: Option<AcquisitionReport>,
}

/// Run the full pipeline for one provider over an open page.
///
/// Extraction and acquisition failures that concern one record are
/// contained; anything returned as `Err` aborted the run.
pub async fn run(
    provider: &dyn Provider,
    page: &mut Page,
    config: &HarvestConfig,
    options: RunOptions,
) -> HarvestResult<RunSummary> {
    let span = tracing::info_span!(
        "harvest",
        provider = provider.name(),
        run_date = %config.run_date
    );
    run_inner(provider, page, config, options).instrument(span).await
}

async fn run_inner(
    provider: &dyn Provider,
    page: &mut Page,
    config: &HarvestConfig,
    options: RunOptions,
) -> HarvestResult<RunSummary> {
    let run_dir = config.run_dir(provider.name());
    std::fs::create_dir_all(&run_dir)?;
    let store = CatalogStore::in_run_directory(&run_dir);

    page.navigate(provider.catalog_url()).await?;
    page.settle(config.timing.settle_after_navigation).await;
    provider.dismiss_entry_banners(page).await?;

    let (snapshot, resumed) = if options.resume && store.exists() {
        let snapshot = store.load()?;
        tracing::info!(
            records = snapshot.len(),
            path = %store.path().display(),
            "Resuming from stored snapshot"
        );
        (snapshot, true)
    } else {
        if options.resume {
            tracing::warn!(path = %store.path().display(), "No stored snapshot, extracting");
        }
        let snapshot = extract(provider, page, config, &store).await?;
        (snapshot, false)
    };

    let acquisition = if options.skip_files {
        tracing::info!("Skipping holdings files");
        None
    } else {
        let ctx = AcquisitionContext {
            dir: run_dir.clone(),
            http_timeout: config.http_timeout,
            timing: config.timing,
        };
        Some(provider.acquire_files(page, &snapshot, &ctx).await?)
    };

    Ok(RunSummary {
        provider: provider.name().to_string(),
        run_dir,
        records: snapshot.len(),
        resumed,
        acquisition,
    })
}

async fn extract(
    provider: &dyn Provider,
    page: &mut Page,
    config: &HarvestConfig,
    store: &CatalogStore,
) -> HarvestResult<CatalogSnapshot> {
    let snapshot = provider.extract_catalog(page, &config.timing).await?;
    if snapshot.is_empty() {
        tracing::warn!("Catalog is empty");
    }
    for (class, count) in snapshot.by_asset_class() {
        tracing::debug!(asset_class = %class, records = count, "Catalog partition");
    }
    store.save(&snapshot)?;
    Ok(snapshot)
}
