//! `harvest run <provider>`: launch the browser and run the pipeline.

use crate::cli::output;
use crate::config::HarvestConfig;
use crate::page::Page;
use crate::pipeline::{self, RunOptions, RunSummary};
use crate::providers;
use crate::renderer::chromium::{ChromiumOptions, ChromiumRenderer};
use crate::renderer::Renderer;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

/// Arguments of the run command.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub provider: String,
    pub base_dir: Option<PathBuf>,
    pub date: Option<String>,
    pub headless: bool,
    pub resume: bool,
    pub skip_files: bool,
    pub json: bool,
}

/// Run the harvest for one provider.
pub async fn run(args: RunArgs) -> Result<()> {
    let provider = providers::by_name(&args.provider).ok_or_else(|| {
        anyhow!(
            "unknown provider '{}' (available: {})",
            args.provider,
            providers::names()
        )
    })?;
    let config = HarvestConfig::resolve(
        args.base_dir.as_deref(),
        args.date.as_deref(),
        args.headless,
    )?;
    let run_dir = config.run_dir(provider.name());
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("cannot create run directory {}", run_dir.display()))?;

    let renderer = ChromiumRenderer::new(ChromiumOptions {
        headless: config.headless,
        download_dir: Some(run_dir),
    })
    .await?;

    let context = match renderer.new_context().await {
        Ok(context) => context,
        Err(e) => {
            if let Err(close_err) = renderer.shutdown().await {
                tracing::warn!(error = %close_err, "Failed to close the browser");
            }
            return Err(e);
        }
    };
    let mut page =
        Page::new(context, config.wait).with_navigation_timeout(config.navigation_timeout);

    let options = RunOptions {
        resume: args.resume,
        skip_files: args.skip_files,
    };
    let result = pipeline::run(provider.as_ref(), &mut page, &config, options).await;

    // Release the browser on every exit path before reporting.
    if let Err(e) = page.close().await {
        tracing::warn!(error = %e, "Failed to close the page");
    }
    if let Err(e) = renderer.shutdown().await {
        tracing::warn!(error = %e, "Failed to close the browser");
    }

    let summary = result.with_context(|| format!("{} harvest aborted", provider.name()))?;
    report(&summary, args.json)
}

fn report(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        return output::print_json(summary);
    }

    println!("Harvest: {}", summary.provider);
    output::print_field("Directory:", summary.run_dir.display(), 12);
    let source = if summary.resumed { " (resumed)" } else { "" };
    output::print_field("Records:", format!("{}{source}", summary.records), 12);

    match &summary.acquisition {
        None => output::print_field("Files:", "skipped", 12),
        Some(report) => {
            output::print_field("Files:", report.acquired.len(), 12);
            output::print_field("Failed:", report.failed.len(), 12);
            for failure in &report.failed {
                println!("    {} [{}] {}", failure.identifier, failure.kind, failure.message);
            }
        }
    }
    Ok(())
}
