//! JSON snapshot storage for catalog records.
//!
//! One file per provider per run date at
//! `{base}/{run_date}/{provider}/products.json`. Saves replace the whole
//! document; there are no partial or incremental writes.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::HarvestResult;
use crate::types::CatalogSnapshot;

/// File name of the snapshot inside a run directory.
pub const SNAPSHOT_FILE_NAME: &str = "products.json";

/// Build the run directory `{base}/{YYYY-MM-DD}/{provider}`.
pub fn run_directory(base: &Path, run_date: NaiveDate, provider: &str) -> PathBuf {
    base.join(run_date.format("%Y-%m-%d").to_string())
        .join(provider)
}

/// Durable, idempotent store for one provider's [`CatalogSnapshot`].
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    /// Store rooted at a run directory.
    pub fn in_run_directory(run_dir: &Path) -> Self {
        Self {
            path: run_dir.join(SNAPSHOT_FILE_NAME),
        }
    }

    /// Store at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a snapshot has been saved at this path.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write the full snapshot, replacing any previous one.
    ///
    /// The document is written to a sibling temp file and renamed over the
    /// target, so readers never observe a half-written snapshot.
    pub fn save(&self, snapshot: &CatalogSnapshot) -> HarvestResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            Self::write_to(snapshot, &mut file)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;

        tracing::info!(
            path = %self.path.display(),
            records = snapshot.len(),
            "Saved catalog snapshot"
        );
        Ok(())
    }

    /// Read the snapshot back.
    pub fn load(&self) -> HarvestResult<CatalogSnapshot> {
        let mut file = std::fs::File::open(&self.path)?;
        let snapshot = Self::read_from(&mut file)?;
        tracing::info!(
            path = %self.path.display(),
            records = snapshot.len(),
            "Loaded catalog snapshot"
        );
        Ok(snapshot)
    }

    /// Serialize a snapshot to any writer.
    pub fn write_to<W: Write>(snapshot: &CatalogSnapshot, writer: &mut W) -> HarvestResult<()> {
        serde_json::to_writer_pretty(&mut *writer, snapshot)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Deserialize a snapshot from any reader.
    pub fn read_from<R: Read>(reader: &mut R) -> HarvestResult<CatalogSnapshot> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(serde_json::from_slice(&buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvestError;
    use crate::types::CanonicalRecord;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    fn make_record(name: &str) -> CanonicalRecord {
        CanonicalRecord {
            name: Some(name.to_string()),
            asset_class: None,
            currency: Some("EUR".to_string()),
            hedged: Some("No".to_string()),
            distribution: Some("Accumulazione".to_string()),
            ter: Some("0,20".to_string()),
            price: Some("EUR 98,14".to_string()),
            date: Some("16/ott/2026".to_string()),
            ticker: Some("SWDA".to_string()),
            factsheet: Some("https://example.com/fs.pdf".to_string()),
            kid: Some("https://example.com/kid.pdf".to_string()),
            product_page: "https://example.com/products/251882".to_string(),
            holdings_file: Some(
                "https://example.com/products/251882/fund/1467271812596.ajax?fileType=csv"
                    .to_string(),
            ),
        }
    }

    fn make_snapshot() -> CatalogSnapshot {
        let mut snapshot = CatalogSnapshot::new();
        snapshot.insert("IE00B4L5Y983", make_record("iShares Core MSCI World"));
        snapshot.insert(
            "IE00BK5BQT80",
            CanonicalRecord {
                asset_class: Some("equity".into()),
                holdings_file: None,
                ..make_record("Vanguard FTSE All-World")
            },
        );
        snapshot
    }

    #[test]
    fn test_roundtrip_empty() {
        let snapshot = CatalogSnapshot::new();
        let mut buf = Vec::new();
        CatalogStore::write_to(&snapshot, &mut buf).unwrap();

        let loaded = CatalogStore::read_from(&mut &buf[..]).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_file_roundtrip_is_field_for_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::in_run_directory(&dir.path().join("2026-10-18/ishares"));
        let snapshot = make_snapshot();

        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, snapshot);

        // save(load(save(S))) produces the same bytes
        let first = std::fs::read(store.path()).unwrap();
        store.save(&loaded).unwrap();
        let second = std::fs::read(store.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::in_run_directory(dir.path());

        store.save(&make_snapshot()).unwrap();
        let mut smaller = CatalogSnapshot::new();
        smaller.insert("IE00ABC", make_record("only"));
        store.save(&smaller).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get("IE00ABC").is_some());
        assert!(!dir.path().join("products.json.tmp").exists());
    }

    #[test]
    fn test_document_uses_fixed_field_names() {
        let mut snapshot = CatalogSnapshot::new();
        snapshot.insert(
            "IE00ABC",
            CanonicalRecord {
                name: Some("Fund".into()),
                product_page: "https://example.com/p".into(),
                ..Default::default()
            },
        );
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_json_eq!(
            value,
            json!({
                "IE00ABC": {
                    "name": "Fund",
                    "asset_class": null,
                    "currency": null,
                    "hedged": null,
                    "distribution": null,
                    "ter": null,
                    "price": null,
                    "date": null,
                    "ticker": null,
                    "factsheet": null,
                    "kid": null,
                    "product_page": "https://example.com/p",
                    "holdings_file": null
                }
            })
        );
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::in_run_directory(dir.path());
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(HarvestError::Io(_))));
    }

    #[test]
    fn test_run_directory_layout() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let dir = run_directory(Path::new("/data/etfs"), date, "vanguard");
        assert_eq!(dir, PathBuf::from("/data/etfs/2026-10-18/vanguard"));
    }
}
