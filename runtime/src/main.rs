// Copyright 2026 Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use harvest_runtime::cli;
use harvest_runtime::cli::run_cmd::RunArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Harvest: ETF catalog and holdings-file harvester",
    version,
    after_help = "Run 'harvest <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a provider's catalog and download its holdings files
    Run {
        /// Provider name (see `harvest providers`)
        provider: String,
        /// Base download directory (default: $HARVEST_DOWNLOAD_DIR or ~/etfs_downloads)
        #[arg(long)]
        base_dir: Option<PathBuf>,
        /// Run date as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Run the browser without a window
        #[arg(long)]
        headless: bool,
        /// Reuse the stored snapshot for this date instead of re-extracting
        #[arg(long)]
        resume: bool,
        /// Stop after saving the snapshot
        #[arg(long)]
        skip_files: bool,
    },
    /// Print a stored snapshot
    Show {
        /// Provider name
        provider: String,
        /// Base download directory
        #[arg(long)]
        base_dir: Option<PathBuf>,
        /// Run date as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List registered providers
    Providers,
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().with_current_span(true).init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let result: Result<()> = match cli.command {
        Commands::Run {
            provider,
            base_dir,
            date,
            headless,
            resume,
            skip_files,
        } => {
            cli::run_cmd::run(RunArgs {
                provider,
                base_dir,
                date,
                headless,
                resume,
                skip_files,
                json: cli.json,
            })
            .await
        }
        Commands::Show {
            provider,
            base_dir,
            date,
        } => cli::show_cmd::run(&provider, base_dir, date.as_deref(), cli.json).await,
        Commands::Providers => cli::providers_cmd::run(cli.json).await,
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "harvest", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
