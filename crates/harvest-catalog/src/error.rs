//! Error taxonomy for extraction and acquisition.

use std::io;
use std::path::PathBuf;

/// All errors that can occur while harvesting a provider catalog.
///
/// Per-record failures (`NotFound`, `UnidentifiableRecord`, `TransferFailure`,
/// `EmptyDownloadDirectory`, `RenameFailure`, `MissingReference`, `Http`) are
/// contained by the caller and logged. Structural failures abort the run;
/// see [`HarvestError::is_fatal`].
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("element not found after {waited_ms}ms: {locator}")]
    NotFound { locator: String, waited_ms: u64 },

    #[error("unsupported locator kind: {0}")]
    UnsupportedLocatorKind(String),

    #[error("no natural identifier for record {record}")]
    UnidentifiableRecord { record: String },

    #[error("unknown partition kind: {0:?}")]
    UnknownPartitionKind(String),

    #[error("transfer of {url} failed with HTTP status {status}")]
    TransferFailure { url: String, status: u16 },

    #[error("no downloaded file found in {}", .0.display())]
    EmptyDownloadDirectory(PathBuf),

    #[error("failed to rename {} to {}: {source}", .from.display(), .to.display())]
    RenameFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("record {record} has no {field}")]
    MissingReference { record: String, field: &'static str },

    #[error("rendering engine error: {0}")]
    Engine(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// Whether this error means the provider's pages no longer match the
    /// harvester's assumptions (or the engine is gone) and the run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarvestError::UnsupportedLocatorKind(_)
                | HarvestError::UnknownPartitionKind(_)
                | HarvestError::Engine(_)
        )
    }

    /// Whether this is the recoverable "element absent" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HarvestError::NotFound { .. })
    }

    /// Short stable tag used as the `kind` field of log events.
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestError::NotFound { .. } => "not_found",
            HarvestError::UnsupportedLocatorKind(_) => "unsupported_locator_kind",
            HarvestError::UnidentifiableRecord { .. } => "unidentifiable_record",
            HarvestError::UnknownPartitionKind(_) => "unknown_partition_kind",
            HarvestError::TransferFailure { .. } => "transfer_failure",
            HarvestError::EmptyDownloadDirectory(_) => "empty_download_directory",
            HarvestError::RenameFailure { .. } => "rename_failure",
            HarvestError::MissingReference { .. } => "missing_reference",
            HarvestError::Engine(_) => "engine",
            HarvestError::Http(_) => "http",
            HarvestError::Io(_) => "io",
            HarvestError::Json(_) => "json",
        }
    }
}

/// Convenience result type.
pub type HarvestResult<T> = Result<T, HarvestError>;
