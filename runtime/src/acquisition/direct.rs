//! Direct transfer: GET the holdings URL and write the body to disk.

use super::http_client::HttpClient;
use super::naming::{content_disposition_extension, query_file_type, target_file_name};
use super::Acquirer;
use async_trait::async_trait;
use harvest_catalog::{
    AcquiredFile, AcquisitionMode, CanonicalRecord, HarvestError, HarvestResult,
};
use std::path::PathBuf;

/// Downloads `holdings_file` over HTTP into `{dir}/{identifier}.{ext}`.
pub struct DirectTransfer {
    client: HttpClient,
    dir: PathBuf,
    fallback_extension: &'static str,
}

impl DirectTransfer {
    pub fn new(
        client: HttpClient,
        dir: impl Into<PathBuf>,
        fallback_extension: &'static str,
    ) -> Self {
        Self {
            client,
            dir: dir.into(),
            fallback_extension,
        }
    }
}

#[async_trait]
impl Acquirer for DirectTransfer {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::DirectTransfer
    }

    async fn acquire(
        &mut self,
        identifier: &str,
        record: &CanonicalRecord,
    ) -> HarvestResult<AcquiredFile> {
        let url = record
            .holdings_file
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| HarvestError::MissingReference {
                record: identifier.to_string(),
                field: "holdings_file",
            })?;

        tracing::info!(identifier, url, "Downloading file");
        let resp = self
            .client
            .get(url)
            .await
            .map_err(|e| HarvestError::Http(format!("{url}: {e:#}")))?;

        if resp.status != 200 {
            return Err(HarvestError::TransferFailure {
                url: url.to_string(),
                status: resp.status,
            });
        }

        let extension = query_file_type(url)
            .or_else(|| resp.header("content-disposition").and_then(content_disposition_extension))
            .unwrap_or_else(|| self.fallback_extension.to_string());

        let path = self.dir.join(target_file_name(identifier, &extension));
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &resp.body).await?;

        Ok(AcquiredFile {
            identifier: identifier.to_string(),
            path,
            mode: AcquisitionMode::DirectTransfer,
        })
    }
}
