//! Harvest catalog: record types, error taxonomy, and snapshot storage
//! shared by every provider harvester.

pub mod error;
pub mod storage;
pub mod types;

pub use error::{HarvestError, HarvestResult};
pub use storage::{run_directory, CatalogStore, SNAPSHOT_FILE_NAME};
pub use types::*;
