//! Holdings-file acquisition.
//!
//! Two strategies produce `{identifier}.{ext}` in the run directory:
//! [`direct::DirectTransfer`] fetches the holdings URL over HTTP, and
//! [`ui_download::UiDownload`] clicks an in-page download control and
//! renames whatever the browser saved. They share the [`Acquirer`] contract
//! but not a code path, since they fail in different ways.

pub mod direct;
pub mod http_client;
pub mod naming;
pub mod ui_download;

use async_trait::async_trait;
use harvest_catalog::{
    AcquiredFile, AcquisitionMode, CanonicalRecord, CatalogSnapshot, HarvestResult,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default pause between successive acquisitions (500ms).
pub const DEFAULT_TRANSFER_PAUSE: Duration = Duration::from_millis(500);

/// Obtains the holdings file for one canonical record.
#[async_trait]
pub trait Acquirer: Send {
    fn mode(&self) -> AcquisitionMode;
    async fn acquire(
        &mut self,
        identifier: &str,
        record: &CanonicalRecord,
    ) -> HarvestResult<AcquiredFile>;
}

/// A record whose file could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionFailure {
    pub identifier: String,
    pub kind: String,
    pub message: String,
}

/// Outcome of acquiring a whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionReport {
    pub acquired: Vec<AcquiredFile>,
    pub failed: Vec<AcquisitionFailure>,
}

impl AcquisitionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Acquire every record of the snapshot, one at a time.
///
/// Per-record failures are logged and collected; the first fatal failure
/// stops the remaining acquisitions and is returned. A flat pause separates
/// successive records.
pub async fn acquire_all(
    acquirer: &mut dyn Acquirer,
    snapshot: &CatalogSnapshot,
    pause: Duration,
) -> HarvestResult<AcquisitionReport> {
    let mode = acquirer.mode();
    tracing::info!(records = snapshot.len(), ?mode, "Acquiring holdings files");
    let mut report = AcquisitionReport::default();

    for (i, (identifier, record)) in snapshot.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        match acquirer.acquire(identifier, record).await {
            Ok(file) => {
                tracing::info!(identifier, path = %file.path.display(), "Holdings file acquired");
                report.acquired.push(file);
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(identifier, kind = e.kind(), error = %e, "Aborting acquisition");
                return Err(e);
            }
            Err(e) => {
                tracing::error!(
                    identifier,
                    kind = e.kind(),
                    error = %e,
                    "Failed to acquire holdings file"
                );
                report.failed.push(AcquisitionFailure {
                    identifier: identifier.to_string(),
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        acquired = report.acquired.len(),
        failed = report.failed.len(),
        "Acquisition finished"
    );
    Ok(report)
}
