//! `harvest providers`: list registered providers.

use crate::cli::output;
use crate::providers;
use anyhow::Result;
use serde_json::json;

pub async fn run(json: bool) -> Result<()> {
    let all = providers::all();
    if json {
        let list: Vec<_> = all
            .iter()
            .map(|p| json!({ "name": p.name(), "catalog_url": p.catalog_url() }))
            .collect();
        return output::print_json(&list);
    }

    for provider in all {
        output::print_field(provider.name(), provider.catalog_url(), 10);
    }
    Ok(())
}
