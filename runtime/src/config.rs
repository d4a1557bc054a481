//! Run configuration and path resolution.

use crate::acquisition::ui_download::DEFAULT_DOWNLOAD_SETTLE;
use crate::acquisition::DEFAULT_TRANSFER_PAUSE;
use crate::page::{WaitPolicy, DEFAULT_NAVIGATION_TIMEOUT};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the base download directory.
pub const DOWNLOAD_DIR_ENV: &str = "HARVEST_DOWNLOAD_DIR";

/// Directory name under the home directory used when nothing else is set.
pub const DEFAULT_DOWNLOAD_DIR_NAME: &str = "etfs_downloads";

/// Default wait after a navigation for client-side rendering (1 second).
pub const DEFAULT_NAVIGATION_SETTLE: Duration = Duration::from_secs(1);

/// Default HTTP timeout for direct transfers (60 seconds).
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed pauses taken by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// After every navigation.
    pub settle_after_navigation: Duration,
    /// After clicking a download control.
    pub download_settle: Duration,
    /// Between two acquisitions.
    pub transfer_pause: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_after_navigation: DEFAULT_NAVIGATION_SETTLE,
            download_settle: DEFAULT_DOWNLOAD_SETTLE,
            transfer_pause: DEFAULT_TRANSFER_PAUSE,
        }
    }
}

impl Timing {
    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            settle_after_navigation: Duration::ZERO,
            download_settle: Duration::ZERO,
            transfer_pause: Duration::ZERO,
        }
    }
}

/// Everything a run needs besides the provider.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub base_dir: PathBuf,
    pub run_date: NaiveDate,
    pub headless: bool,
    pub wait: WaitPolicy,
    pub navigation_timeout: Duration,
    pub timing: Timing,
    pub http_timeout: Duration,
}

impl HarvestConfig {
    pub fn new(base_dir: impl Into<PathBuf>, run_date: NaiveDate) -> Self {
        Self {
            base_dir: base_dir.into(),
            run_date,
            headless: false,
            wait: WaitPolicy::default(),
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            timing: Timing::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Resolve from command-line values, the environment and defaults.
    pub fn resolve(base_dir: Option<&Path>, date: Option<&str>, headless: bool) -> Result<Self> {
        let mut config = Self::new(resolve_base_dir(base_dir)?, resolve_run_date(date)?);
        config.headless = headless;
        Ok(config)
    }

    /// `{base}/{YYYY-MM-DD}/{provider}`.
    pub fn run_dir(&self, provider: &str) -> PathBuf {
        harvest_catalog::run_directory(&self.base_dir, self.run_date, provider)
    }
}

/// Base directory: explicit > `HARVEST_DOWNLOAD_DIR` > `~/etfs_downloads`.
pub fn resolve_base_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(DOWNLOAD_DIR_ENV) {
        if !env_path.trim().is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }

    let home = dirs::home_dir().context("cannot determine the home directory")?;
    Ok(home.join(DEFAULT_DOWNLOAD_DIR_NAME))
}

/// Run date: explicit `YYYY-MM-DD` or today's local date.
pub fn resolve_run_date(explicit: Option<&str>) -> Result<NaiveDate> {
    match explicit {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid run date '{s}', expected YYYY-MM-DD")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}
