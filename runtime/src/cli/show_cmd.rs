//! `harvest show <provider>`: print a stored snapshot.

use crate::cli::output;
use crate::config::HarvestConfig;
use crate::providers;
use anyhow::{anyhow, Context, Result};
use harvest_catalog::CatalogStore;
use std::path::PathBuf;

/// Print the snapshot stored for a provider and date.
pub async fn run(
    provider: &str,
    base_dir: Option<PathBuf>,
    date: Option<&str>,
    json: bool,
) -> Result<()> {
    let provider = providers::by_name(provider).ok_or_else(|| {
        anyhow!(
            "unknown provider '{provider}' (available: {})",
            providers::names()
        )
    })?;
    let config = HarvestConfig::resolve(base_dir.as_deref(), date, false)?;
    let store = CatalogStore::in_run_directory(&config.run_dir(provider.name()));

    let snapshot = store
        .load()
        .with_context(|| format!("no snapshot at {}", store.path().display()))?;

    if json {
        return output::print_json(&snapshot);
    }

    println!("{} {} ({} records)", provider.name(), config.run_date, snapshot.len());
    for (class, count) in snapshot.by_asset_class() {
        output::print_field(&format!("{class}:"), count, 14);
    }
    println!();
    for (identifier, record) in snapshot.iter() {
        let name = record.name.as_deref().unwrap_or("-");
        let ter = record.ter.as_deref().unwrap_or("-");
        let file = if record.holdings_file.is_some() { "link" } else { "-" };
        println!(
            "  {identifier:<14} {:<48} {ter:>6}  {file}",
            output::truncate(name, 48)
        );
    }
    Ok(())
}
