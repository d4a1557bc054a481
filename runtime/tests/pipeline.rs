//! End-to-end harvest runs against scripted provider sites.
//!
//! Pages are served by the in-memory renderer; holdings files for direct
//! transfers are served by a local mock HTTP server.

use chrono::NaiveDate;
use harvest_catalog::{CanonicalRecord, CatalogSnapshot, CatalogStore, HarvestError};
use harvest_runtime::config::{HarvestConfig, Timing};
use harvest_runtime::page::{Page, WaitPolicy};
use harvest_runtime::pipeline::{self, RunOptions};
use harvest_runtime::providers::{ishares, vanguard, IShares, Vanguard};
use harvest_runtime::renderer::memory::{MemoryPage, MemorySite};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ──

fn config(base: &Path) -> HarvestConfig {
    let mut config = HarvestConfig::new(base, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    config.wait = WaitPolicy {
        timeout: Duration::from_millis(20),
        poll_interval: Duration::from_millis(5),
    };
    config.timing = Timing::none();
    config.http_timeout = Duration::from_secs(5);
    config
}

fn page_for(site: &MemorySite, config: &HarvestConfig) -> Page {
    Page::new(Box::new(site.context()), config.wait)
}

fn ishares_row(body: &str, i: usize, cell: &str) -> String {
    format!("{body}/tr[{i}]/{cell}")
}

/// A detail page carrying an ISIN, a price, and a holdings link.
fn ishares_detail(isin: Option<&str>, holdings: &str) -> MemoryPage {
    let layout = ishares::detail_layout();
    let mut page = MemoryPage::new();
    if let Some(isin) = isin {
        page = page.text(layout.identifier.expression.clone(), isin);
    }
    for field in &layout.fields {
        page = match field.field {
            harvest_catalog::Field::Price => page.text(field.locator.expression.clone(), "98,12"),
            harvest_catalog::Field::HoldingsFile => {
                page.link(field.locator.expression.clone(), "Holdings", holdings)
            }
            _ => page,
        };
    }
    page
}

// ── iShares: listing + detail pages + direct transfer ──

#[tokio::test]
async fn test_ishares_full_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/holdings/swda.ajax"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"Ticker,Weight\nAAPL,4.9".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/holdings/gone.ajax"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let body = ishares::listing_layout().partitions[0].body.expression.clone();
    let site = MemorySite::new();
    site.page(
        ishares::CATALOG_URL,
        MemoryPage::new()
            .button(r#"//*[@id="onetrust-reject-all-handler"]"#)
            .text(body.clone(), "")
            .count(format!("{body}/tr"), 4)
            // 1: ETF, fully enriched
            .text(ishares_row(&body, 1, "td[1]"), "ETF")
            .text(ishares_row(&body, 1, "th"), "iShares Core MSCI World\nUCITS ETF")
            .link(ishares_row(&body, 1, "th//a"), "iShares Core MSCI World", "https://ishares.test/swda")
            .text(ishares_row(&body, 1, "td[2]"), "USD")
            .text(ishares_row(&body, 1, "td[5]"), "0,20")
            // 2: not an ETF
            .text(ishares_row(&body, 2, "td[1]"), "ETC")
            .link(ishares_row(&body, 2, "th//a"), "Physical Gold", "https://ishares.test/gold")
            // 3: ETF whose page never shows an ISIN
            .text(ishares_row(&body, 3, "td[1]"), "ETF")
            .link(ishares_row(&body, 3, "th//a"), "Broken", "https://ishares.test/broken")
            // 4: ETF whose holdings file is gone
            .text(ishares_row(&body, 4, "td[1]"), "ETF")
            .link(ishares_row(&body, 4, "th//a"), "Old Fund", "https://ishares.test/old"),
    )
    .page(
        "https://ishares.test/swda",
        ishares_detail(
            Some("IE00B4L5Y983"),
            &format!("{}/holdings/swda.ajax?fileType=csv&dataType=fund", server.uri()),
        ),
    )
    .page("https://ishares.test/broken", ishares_detail(None, "https://ishares.test/x"))
    .page(
        "https://ishares.test/old",
        ishares_detail(
            Some("IE00OLD00001"),
            &format!("{}/holdings/gone.ajax?fileType=csv", server.uri()),
        ),
    );

    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let mut page = page_for(&site, &config);

    let summary = pipeline::run(&IShares, &mut page, &config, RunOptions::default())
        .await
        .unwrap();

    assert!(!summary.resumed);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.run_dir, base.path().join("2024-03-01").join("ishares"));

    let snapshot = CatalogStore::in_run_directory(&summary.run_dir).load().unwrap();
    let swda = snapshot.get("IE00B4L5Y983").unwrap();
    assert_eq!(swda.name.as_deref(), Some("iShares Core MSCI World"));
    assert_eq!(swda.price.as_deref(), Some("98,12"));
    assert_eq!(swda.product_page, "https://ishares.test/swda");
    assert!(swda.hedged.is_none());
    assert!(snapshot.get("IE00OLD00001").is_some());

    let report = summary.acquisition.unwrap();
    assert_eq!(report.acquired.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].identifier, "IE00OLD00001");
    assert_eq!(report.failed[0].kind, "transfer_failure");
    assert_eq!(
        std::fs::read(summary.run_dir.join("IE00B4L5Y983.csv")).unwrap(),
        b"Ticker,Weight\nAAPL,4.9"
    );
    assert!(!summary.run_dir.join("IE00OLD00001.csv").exists());
}

// ── Vanguard: partitioned listing + UI download ──

fn vanguard_catalog() -> MemoryPage {
    let layout = vanguard::listing_layout();
    let equity = layout.partitions[0].body.expression.clone();
    let multi = layout.partitions[2].body.expression.clone();

    let row = |body: &str, cell: &str| format!("{body}/tr[1]/{cell}");
    MemoryPage::new()
        .text(equity.clone(), "")
        .count(format!("{equity}/tr"), 1)
        .text(row(&equity, "th"), "FTSE All-World UCITS ETF\n(USD) Accumulating")
        .link(row(&equity, "th//a"), "FTSE All-World", "https://vanguard.test/vwce")
        .text(row(&equity, "td[1]"), "USD")
        .text(row(&equity, "td[5]"), "IE00BK5BQT80")
        .text(row(&equity, "td[6]"), "VWCE GY")
        // The bond body is missing from this page.
        .text(multi.clone(), "")
        .count(format!("{multi}/tr"), 1)
        .text(row(&multi, "th"), "LifeStrategy 80% Equity UCITS ETF")
        .link(row(&multi, "th//a"), "LifeStrategy 80%", "https://vanguard.test/v80a")
        .text(row(&multi, "td[5]"), "IE00BMVB5R75")
}

fn vanguard_product(trigger_for: &str, file_name: &str) -> MemoryPage {
    let trigger = vanguard::download_triggers()
        .for_partition(Some(trigger_for))
        .unwrap()
        .expression
        .clone();
    MemoryPage::new().download_button(trigger, file_name, b"holdings".to_vec())
}

#[tokio::test]
async fn test_vanguard_full_run() {
    let base = TempDir::new().unwrap();
    let mut config = config(base.path());
    // Keep successive downloads apart in modification time.
    config.timing.transfer_pause = Duration::from_millis(30);
    let run_dir = config.run_dir("vanguard");

    let site = MemorySite::new();
    site.download_dir(&run_dir)
        .page(vanguard::CATALOG_URL, vanguard_catalog())
        .page(
            "https://vanguard.test/vwce",
            vanguard_product("equity", "Holdings details.xlsx"),
        )
        .page(
            "https://vanguard.test/v80a",
            vanguard_product("multi_asset", "Basket details.xlsx"),
        );
    let mut page = page_for(&site, &config);

    let summary = pipeline::run(&Vanguard, &mut page, &config, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.records, 2);
    let report = summary.acquisition.unwrap();
    assert!(report.is_complete());
    assert!(run_dir.join("IE00BK5BQT80.xlsx").exists());
    assert!(run_dir.join("IE00BMVB5R75.xlsx").exists());
    assert!(!run_dir.join("Holdings details.xlsx").exists());

    let snapshot = CatalogStore::in_run_directory(&run_dir).load().unwrap();
    let vwce = snapshot.get("IE00BK5BQT80").unwrap();
    assert_eq!(
        vwce.name.as_deref(),
        Some("Vanguard FTSE All-World UCITS ETF (USD) Accumulating")
    );
    assert_eq!(vwce.asset_class.as_deref(), Some("equity"));
    assert_eq!(vwce.ticker.as_deref(), Some("VWCE GY"));
    assert_eq!(
        snapshot.get("IE00BMVB5R75").unwrap().asset_class.as_deref(),
        Some("multi_asset")
    );
}

// ── Resume and fatal halts ──

fn stored(run_dir: &Path, records: &[(&str, &str, &str)]) -> CatalogSnapshot {
    let mut snapshot = CatalogSnapshot::new();
    for (id, class, url) in records {
        snapshot.insert(
            *id,
            CanonicalRecord {
                asset_class: Some(class.to_string()),
                product_page: url.to_string(),
                ..Default::default()
            },
        );
    }
    std::fs::create_dir_all(run_dir).unwrap();
    CatalogStore::in_run_directory(run_dir).save(&snapshot).unwrap();
    snapshot
}

#[tokio::test]
async fn test_resume_skips_extraction() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let run_dir = config.run_dir("vanguard");
    let before = stored(&run_dir, &[("IE00BK5BQT80", "equity", "https://vanguard.test/vwce")]);

    // The catalog page has no table: extracting would produce nothing.
    let site = MemorySite::new();
    site.page(vanguard::CATALOG_URL, MemoryPage::new());
    let mut page = page_for(&site, &config);

    let options = RunOptions {
        resume: true,
        skip_files: true,
    };
    let summary = pipeline::run(&Vanguard, &mut page, &config, options).await.unwrap();

    assert!(summary.resumed);
    assert_eq!(summary.records, 1);
    assert!(summary.acquisition.is_none());
    assert_eq!(site.visits(), vec![vanguard::CATALOG_URL.to_string()]);
    assert_eq!(CatalogStore::in_run_directory(&run_dir).load().unwrap(), before);
}

#[tokio::test]
async fn test_unknown_asset_class_aborts_run() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let run_dir = config.run_dir("vanguard");
    stored(
        &run_dir,
        &[
            ("IE00A", "equity", "https://vanguard.test/a"),
            ("IE00B", "money_market", "https://vanguard.test/b"),
            ("IE00C", "equity", "https://vanguard.test/c"),
        ],
    );

    let site = MemorySite::new();
    site.download_dir(&run_dir)
        .page(vanguard::CATALOG_URL, MemoryPage::new())
        .page("https://vanguard.test/a", vanguard_product("equity", "a.xlsx"))
        .page("https://vanguard.test/c", vanguard_product("equity", "c.xlsx"));
    let mut page = page_for(&site, &config);

    let options = RunOptions {
        resume: true,
        skip_files: false,
    };
    let err = pipeline::run(&Vanguard, &mut page, &config, options)
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::UnknownPartitionKind(ref k) if k == "money_market"));
    assert!(run_dir.join("IE00A.xlsx").exists());
    assert!(!run_dir.join("IE00C.xlsx").exists());
    assert!(!site.visits().contains(&"https://vanguard.test/c".to_string()));
}
