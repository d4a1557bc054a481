//! UI-triggered download: click the page's download control, then rename
//! the newest file in the download directory.
//!
//! Only a file that appeared or changed after the click counts as the
//! download. The heuristic assumes nothing else writes into the download
//! directory while a run is acquiring.

use super::naming::{file_extension, target_file_name};
use super::Acquirer;
use crate::locator::Locator;
use crate::page::Page;
use async_trait::async_trait;
use harvest_catalog::{
    AcquiredFile, AcquisitionMode, CanonicalRecord, HarvestError, HarvestResult,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default wait for the browser to finish a download (3 seconds).
pub const DEFAULT_DOWNLOAD_SETTLE: Duration = Duration::from_secs(3);

/// Suffixes browsers use for downloads still in flight.
const PARTIAL_SUFFIXES: &[&str] = &["crdownload", "part", "tmp"];

/// Download-trigger locator per asset-class partition.
#[derive(Debug, Clone, Default)]
pub struct TriggerMap {
    entries: Vec<(&'static str, Locator)>,
}

impl TriggerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, partition: &'static str, trigger: Locator) -> Self {
        self.entries.push((partition, trigger));
        self
    }

    /// The trigger for a partition. An unknown or missing partition means the
    /// page structure is not recognised, which is fatal.
    pub fn for_partition(&self, partition: Option<&str>) -> HarvestResult<&Locator> {
        let name = partition.unwrap_or("");
        self.entries
            .iter()
            .find(|(p, _)| *p == name)
            .map(|(_, loc)| loc)
            .ok_or_else(|| HarvestError::UnknownPartitionKind(name.to_string()))
    }
}

/// Download candidates in `dir` and their modification times, skipping
/// `ignore`d names and in-flight downloads.
fn candidates(dir: &Path, ignore: &[&str]) -> HarvestResult<Vec<(PathBuf, SystemTime)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if ignore.iter().any(|i| *i == name) {
            continue;
        }
        let partial = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| PARTIAL_SUFFIXES.contains(&e));
        if partial {
            continue;
        }
        files.push((path, meta.modified()?));
    }
    Ok(files)
}

/// The download directory as it was before a click.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScan {
    files: HashMap<PathBuf, SystemTime>,
}

impl DirectoryScan {
    pub fn take(dir: &Path, ignore: &[&str]) -> HarvestResult<Self> {
        Ok(Self {
            files: candidates(dir, ignore)?.into_iter().collect(),
        })
    }

    /// New since the scan, or rewritten after it.
    fn is_fresh(&self, path: &Path, modified: SystemTime) -> bool {
        self.files.get(path).map_or(true, |before| modified != *before)
    }
}

/// Newest file in `dir` that appeared or changed since `before`. Files that
/// were already there untouched (earlier records' renamed downloads) never
/// count.
pub fn latest_download(
    dir: &Path,
    ignore: &[&str],
    before: &DirectoryScan,
) -> HarvestResult<PathBuf> {
    candidates(dir, ignore)?
        .into_iter()
        .filter(|(path, modified)| before.is_fresh(path, *modified))
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path)
        .ok_or_else(|| HarvestError::EmptyDownloadDirectory(dir.to_path_buf()))
}

/// Rename the newest fresh download to `{identifier}.{ext}`, keeping the
/// downloaded extension. An existing file of that name is replaced.
pub fn rename_latest_download(
    dir: &Path,
    identifier: &str,
    ignore: &[&str],
    before: &DirectoryScan,
    fallback_extension: &str,
) -> HarvestResult<PathBuf> {
    let latest = latest_download(dir, ignore, before)?;
    let extension = file_extension(&latest).unwrap_or_else(|| fallback_extension.to_string());
    let target = dir.join(target_file_name(identifier, &extension));

    tracing::info!(from = %latest.display(), to = %target.display(), "Renaming file");
    std::fs::rename(&latest, &target).map_err(|source| HarvestError::RenameFailure {
        from: latest.clone(),
        to: target.clone(),
        source,
    })?;
    Ok(target)
}

/// Acquires holdings by clicking the record page's download control.
pub struct UiDownload<'p> {
    page: &'p mut Page,
    dir: PathBuf,
    triggers: TriggerMap,
    ignore: Vec<&'static str>,
    fallback_extension: &'static str,
    settle: Duration,
    download_settle: Duration,
}

impl<'p> UiDownload<'p> {
    pub fn new(
        page: &'p mut Page,
        dir: impl Into<PathBuf>,
        triggers: TriggerMap,
        fallback_extension: &'static str,
    ) -> Self {
        Self {
            page,
            dir: dir.into(),
            triggers,
            ignore: Vec::new(),
            fallback_extension,
            settle: Duration::ZERO,
            download_settle: DEFAULT_DOWNLOAD_SETTLE,
        }
    }

    /// File names in the download directory that are never downloads.
    pub fn ignoring(mut self, names: &[&'static str]) -> Self {
        self.ignore.extend_from_slice(names);
        self
    }

    pub fn with_settle(mut self, after_navigation: Duration, after_click: Duration) -> Self {
        self.settle = after_navigation;
        self.download_settle = after_click;
        self
    }
}

#[async_trait]
impl Acquirer for UiDownload<'_> {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::UiDownload
    }

    async fn acquire(
        &mut self,
        identifier: &str,
        record: &CanonicalRecord,
    ) -> HarvestResult<AcquiredFile> {
        let trigger = self
            .triggers
            .for_partition(record.asset_class.as_deref())?
            .clone();

        if record.product_page.trim().is_empty() {
            return Err(HarvestError::MissingReference {
                record: identifier.to_string(),
                field: "product_page",
            });
        }

        tracing::info!(identifier, url = %record.product_page, "Downloading the holdings file");
        self.page.navigate(&record.product_page).await?;
        self.page.settle(self.settle).await;

        let before = DirectoryScan::take(&self.dir, &self.ignore)?;
        self.page.press(&trigger).await?;
        self.page.settle(self.download_settle).await;

        let path = rename_latest_download(
            &self.dir,
            identifier,
            &self.ignore,
            &before,
            self.fallback_extension,
        )?;
        Ok(AcquiredFile {
            identifier: identifier.to_string(),
            path,
            mode: AcquisitionMode::UiDownload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::acquire_all;
    use crate::page::WaitPolicy;
    use crate::renderer::memory::{MemoryPage, MemorySite};
    use harvest_catalog::CatalogSnapshot;

    const EQUITY_BUTTON: &str = "//europe-core-fund-holdings//europe-core-download-button/button";
    const BOND_BUTTON: &str = "//europe-core-fund-holdings[2]//europe-core-download-button/button";

    fn triggers() -> TriggerMap {
        TriggerMap::new()
            .with("equity", Locator::xpath(EQUITY_BUTTON))
            .with("bond", Locator::xpath(BOND_BUTTON))
    }

    fn record(asset_class: &str, url: &str) -> CanonicalRecord {
        CanonicalRecord {
            asset_class: Some(asset_class.to_string()),
            product_page: url.to_string(),
            ..Default::default()
        }
    }

    fn page_for(site: &MemorySite) -> Page {
        Page::new(
            Box::new(site.context()),
            WaitPolicy {
                timeout: Duration::from_millis(20),
                poll_interval: Duration::from_millis(5),
            },
        )
    }

    fn age(path: &Path) {
        let old = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(old)
            .unwrap();
    }

    #[test]
    fn test_latest_download_skips_snapshot_and_partials() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.csv"), b"a").unwrap();
        age(&dir.path().join("old.csv"));
        std::fs::write(dir.path().join("new.xlsx"), b"b").unwrap();
        std::fs::write(dir.path().join("products.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("next.xlsx.crdownload"), b"c").unwrap();

        let latest =
            latest_download(dir.path(), &["products.json"], &DirectoryScan::default()).unwrap();
        assert_eq!(latest, dir.path().join("new.xlsx"));
    }

    #[test]
    fn test_files_present_before_the_click_are_not_downloads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("IE00A.xlsx"), b"a").unwrap();
        let before = DirectoryScan::take(dir.path(), &["products.json"]).unwrap();

        let err = latest_download(dir.path(), &["products.json"], &before).unwrap_err();
        assert!(matches!(err, HarvestError::EmptyDownloadDirectory(_)));

        std::fs::write(dir.path().join("Holdings.xlsx"), b"b").unwrap();
        let latest = latest_download(dir.path(), &["products.json"], &before).unwrap();
        assert_eq!(latest, dir.path().join("Holdings.xlsx"));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("products.json"), b"{}").unwrap();
        let err = rename_latest_download(
            dir.path(),
            "IE00ABC",
            &["products.json"],
            &DirectoryScan::default(),
            "xlsx",
        )
        .unwrap_err();
        assert!(matches!(err, HarvestError::EmptyDownloadDirectory(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unknown_partition_is_fatal() {
        let err = triggers().for_partition(Some("multi_asset")).unwrap_err();
        assert!(err.is_fatal());
        assert!(triggers().for_partition(None).unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_click_then_rename_to_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let site = MemorySite::new();
        site.download_dir(dir.path()).page(
            "https://example.com/vwce",
            MemoryPage::new().download_button(EQUITY_BUTTON, "Holdings details.xlsx", b"x".to_vec()),
        );
        let mut page = page_for(&site);
        let mut acquirer = UiDownload::new(&mut page, dir.path(), triggers(), "xlsx")
            .with_settle(Duration::ZERO, Duration::ZERO);

        let file = acquirer
            .acquire("IE00BK5BQT80", &record("equity", "https://example.com/vwce"))
            .await
            .unwrap();
        assert_eq!(file.path, dir.path().join("IE00BK5BQT80.xlsx"));
        assert!(file.path.exists());
        assert!(!dir.path().join("Holdings details.xlsx").exists());
    }

    #[tokio::test]
    async fn test_missing_trigger_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let site = MemorySite::new();
        site.download_dir(dir.path())
            .page("https://example.com/a", MemoryPage::new())
            .page(
                "https://example.com/b",
                MemoryPage::new().download_button(BOND_BUTTON, "b.xlsx", b"b".to_vec()),
            );
        let mut page = page_for(&site);
        let mut acquirer = UiDownload::new(&mut page, dir.path(), triggers(), "xlsx")
            .with_settle(Duration::ZERO, Duration::ZERO);

        let mut snapshot = CatalogSnapshot::new();
        snapshot.insert("IE00A", record("equity", "https://example.com/a"));
        snapshot.insert("IE00B", record("bond", "https://example.com/b"));

        let report = acquire_all(&mut acquirer, &snapshot, Duration::ZERO).await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].kind, "not_found");
        assert_eq!(report.acquired.len(), 1);
        assert!(dir.path().join("IE00B.xlsx").exists());
    }

    #[tokio::test]
    async fn test_unknown_partition_halts_remaining_acquisitions() {
        let dir = tempfile::tempdir().unwrap();
        let site = MemorySite::new();
        site.download_dir(dir.path()).page(
            "https://example.com/a",
            MemoryPage::new().download_button(EQUITY_BUTTON, "a.xlsx", b"a".to_vec()),
        );
        let mut page = page_for(&site);
        let mut acquirer = UiDownload::new(&mut page, dir.path(), triggers(), "xlsx")
            .with_settle(Duration::ZERO, Duration::ZERO);

        let mut snapshot = CatalogSnapshot::new();
        snapshot.insert("IE00A", record("equity", "https://example.com/a"));
        snapshot.insert("IE00B", record("crypto", "https://example.com/b"));
        snapshot.insert("IE00C", record("equity", "https://example.com/a"));

        let err = acquire_all(&mut acquirer, &snapshot, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, HarvestError::UnknownPartitionKind(ref p) if p == "crypto"));
        drop(acquirer);
        assert_eq!(site.visits(), vec!["https://example.com/a".to_string()]);
        assert!(dir.path().join("IE00A.xlsx").exists());
        assert!(!dir.path().join("IE00C.xlsx").exists());
    }

    #[tokio::test]
    async fn test_button_without_download_is_not_attributed_a_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let site = MemorySite::new();
        site.download_dir(dir.path())
            .page(
                "https://example.com/a",
                MemoryPage::new().download_button(EQUITY_BUTTON, "Holdings.xlsx", b"A-data".to_vec()),
            )
            .page("https://example.com/b", MemoryPage::new().button(EQUITY_BUTTON));
        let mut page = page_for(&site);
        let mut acquirer = UiDownload::new(&mut page, dir.path(), triggers(), "xlsx")
            .with_settle(Duration::ZERO, Duration::ZERO);

        let mut snapshot = CatalogSnapshot::new();
        snapshot.insert("IE00A", record("equity", "https://example.com/a"));
        snapshot.insert("IE00B", record("equity", "https://example.com/b"));

        let report = acquire_all(&mut acquirer, &snapshot, Duration::ZERO).await.unwrap();
        assert_eq!(report.acquired.len(), 1);
        assert_eq!(report.acquired[0].identifier, "IE00A");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].identifier, "IE00B");
        assert_eq!(report.failed[0].kind, "empty_download_directory");
        assert_eq!(std::fs::read(dir.path().join("IE00A.xlsx")).unwrap(), b"A-data");
        assert!(!dir.path().join("IE00B.xlsx").exists());
    }

    #[tokio::test]
    async fn test_rerun_overwrites_instead_of_duplicating() {
        let dir = tempfile::tempdir().unwrap();
        let previous = dir.path().join("IE00A.xlsx");
        std::fs::write(&previous, b"yesterday").unwrap();
        age(&previous);

        let site = MemorySite::new();
        site.download_dir(dir.path()).page(
            "https://example.com/a",
            MemoryPage::new().download_button(EQUITY_BUTTON, "Holdings.xlsx", b"today".to_vec()),
        );
        let mut page = page_for(&site);
        let mut acquirer = UiDownload::new(&mut page, dir.path(), triggers(), "xlsx")
            .with_settle(Duration::ZERO, Duration::ZERO);

        let file = acquirer
            .acquire("IE00A", &record("equity", "https://example.com/a"))
            .await
            .unwrap();
        assert_eq!(file.path, previous);
        assert_eq!(std::fs::read(&previous).unwrap(), b"today");

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["IE00A.xlsx".to_string()]);
    }

    #[tokio::test]
    async fn test_rename_failure_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory squats on the target name.
        let blocked = dir.path().join("IE00A.xlsx");
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), b"x").unwrap();

        let site = MemorySite::new();
        site.download_dir(dir.path()).page(
            "https://example.com/a",
            MemoryPage::new().download_button(EQUITY_BUTTON, "Holdings.xlsx", b"a".to_vec()),
        );
        let mut page = page_for(&site);
        let mut acquirer = UiDownload::new(&mut page, dir.path(), triggers(), "xlsx")
            .with_settle(Duration::ZERO, Duration::ZERO);

        let err = acquirer
            .acquire("IE00A", &record("equity", "https://example.com/a"))
            .await
            .unwrap_err();
        match &err {
            HarvestError::RenameFailure { from, to, .. } => {
                assert_eq!(from, &dir.path().join("Holdings.xlsx"));
                assert_eq!(to, &blocked);
            }
            other => panic!("expected RenameFailure, got {other:?}"),
        }
        assert!(!err.is_fatal());
        assert_eq!(err.kind(), "rename_failure");
        assert!(dir.path().join("Holdings.xlsx").exists());
    }
}
