//! Vanguard (Italian professional site).
//!
//! The listing is split by asset class and already carries the ISIN, so no
//! detail pages are visited. Holdings files only exist behind a download
//! button whose position depends on the asset class.

use super::{dismiss_banners, AcquisitionContext, Provider, COOKIE_REJECT};
use crate::acquisition::ui_download::{TriggerMap, UiDownload};
use crate::acquisition::{acquire_all, AcquisitionReport};
use crate::config::Timing;
use crate::extract::{enrich, extract_listing, Column, ListingLayout, NameStyle, Partition};
use crate::locator::Locator;
use crate::page::Page;
use async_trait::async_trait;
use harvest_catalog::{CatalogSnapshot, Field, HarvestResult, SNAPSHOT_FILE_NAME};

pub const CATALOG_URL: &str = "https://www.it.vanguard/professional/prodotti?tipo-di-prodotto=etf";

const PROFESSIONAL_INVESTOR: &str = concat!(
    r#"//*[@id="mat-dialog-0"]/europe-core-cookie-consent-dialog/mat-dialog-content/"#,
    "europe-core-consent-box/div/div[2]/div[2]/button[1]"
);

const PRODUCT_TABLE: &str = concat!(
    r#"//*[@id="back-to-top"]/europe-core-root/europe-core-app-main/aem-page/aem-model-provider/"#,
    "aem-responsivegrid/div/aem-responsivegrid/div[4]/",
    "europe-core-product-list-tab-group-container/div/div/div/",
    "europe-core-product-list-tab-item-container/div/europe-core-overview-table-container/",
    "europe-core-product-table/table"
);

const JUMP_LINKS: &str = concat!(
    r#"//*[@id="back-to-top"]/europe-core-root/europe-core-product-page/aem-page/aem-model-provider/"#,
    "aem-responsivegrid/div/aem-responsivegrid/div[3]/europe-core-jump-links-list"
);

const FUND_HOLDINGS_BUTTON: &str = concat!(
    "europe-core-fund-holdings-container/europe-core-fund-holdings/div/div/div[1]/div[2]/",
    "europe-core-download-button/button"
);

const BASKET_BUTTON: &str = concat!(
    "europe-core-basket-details-container/europe-core-basket-details/div/div/div/div[2]/",
    "europe-core-download-button/button"
);

/// Holdings exports without an extension are spreadsheets.
const FALLBACK_EXTENSION: &str = "xlsx";

#[derive(Debug, Clone, Copy, Default)]
pub struct Vanguard;

fn table_body(index: usize) -> Locator {
    Locator::xpath(format!("{PRODUCT_TABLE}/tbody[{index}]"))
}

/// Listing table: one body per asset class, ISIN in the sixth cell.
pub fn listing_layout() -> ListingLayout {
    ListingLayout {
        partitions: vec![
            Partition {
                label: Some("equity"),
                body: table_body(2),
            },
            Partition {
                label: Some("bond"),
                body: table_body(4),
            },
            Partition {
                label: Some("multi_asset"),
                body: table_body(6),
            },
        ],
        row: "tr",
        columns: vec![
            Column::text(Field::Name, "th"),
            Column::href(Field::ProductPage, "th//a"),
            Column::text(Field::Currency, "td[1]"),
            Column::text(Field::Ter, "td[2]"),
            Column::text(Field::Price, "td[3]"),
            Column::text(Field::Date, "td[4]"),
            Column::text(Field::Ticker, "td[6]"),
            Column::href(Field::Factsheet, "td[7]/span/a"),
            Column::href(Field::Kid, "td[8]/span/a"),
        ],
        identifier: Some("td[5]"),
        admission: None,
        name_style: NameStyle::Joined { prefix: "Vanguard " },
    }
}

/// Download buttons on the product page, per asset class.
pub fn download_triggers() -> TriggerMap {
    TriggerMap::new()
        .with(
            "equity",
            Locator::xpath(format!("{JUMP_LINKS}/div[17]/{FUND_HOLDINGS_BUTTON}")),
        )
        .with(
            "bond",
            Locator::xpath(format!("{JUMP_LINKS}/div[18]/{FUND_HOLDINGS_BUTTON}")),
        )
        .with(
            "multi_asset",
            Locator::xpath(format!("{JUMP_LINKS}/div[11]/{BASKET_BUTTON}")),
        )
}

#[async_trait]
impl Provider for Vanguard {
    fn name(&self) -> &'static str {
        "vanguard"
    }

    fn catalog_url(&self) -> &'static str {
        CATALOG_URL
    }

    async fn dismiss_entry_banners(&self, page: &mut Page) -> HarvestResult<()> {
        dismiss_banners(
            page,
            &[
                ("cookie", COOKIE_REJECT),
                ("professional investor", PROFESSIONAL_INVESTOR),
            ],
        )
        .await?;
        Ok(())
    }

    async fn extract_catalog(
        &self,
        page: &mut Page,
        _timing: &Timing,
    ) -> HarvestResult<CatalogSnapshot> {
        let provisional = extract_listing(page, &listing_layout()).await?;
        enrich(page, provisional, None, std::time::Duration::ZERO).await
    }

    async fn acquire_files(
        &self,
        page: &mut Page,
        snapshot: &CatalogSnapshot,
        ctx: &AcquisitionContext,
    ) -> HarvestResult<AcquisitionReport> {
        let mut acquirer = UiDownload::new(page, &ctx.dir, download_triggers(), FALLBACK_EXTENSION)
            .ignoring(&[SNAPSHOT_FILE_NAME])
            .with_settle(ctx.timing.settle_after_navigation, ctx.timing.download_settle);
        acquire_all(&mut acquirer, snapshot, ctx.timing.transfer_pause).await
    }
}
