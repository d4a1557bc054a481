//! iShares (Italian retail site).
//!
//! The listing does not expose the ISIN, so every row is enriched from its
//! product page. Holdings files are plain HTTP downloads whose `fileType`
//! query names the extension.

use super::{dismiss_banners, AcquisitionContext, Provider, COOKIE_REJECT};
use crate::acquisition::direct::DirectTransfer;
use crate::acquisition::http_client::HttpClient;
use crate::acquisition::{acquire_all, AcquisitionReport};
use crate::config::Timing;
use crate::extract::{
    enrich, extract_listing, Admission, Column, DetailField, DetailLayout, ListingLayout,
    NameStyle, Partition, Read,
};
use crate::locator::Locator;
use crate::page::Page;
use async_trait::async_trait;
use harvest_catalog::{CatalogSnapshot, Field, HarvestResult};

pub const CATALOG_URL: &str =
    "https://www.ishares.com/it/investitore-privato/it/prodotti/etf-investments";

const PRIVATE_INVESTOR: &str = r#"//*[starts-with(@id, "direct-url-screen-")]/div/div[2]/div"#;
const VIEW_ALL: &str = r#"//*[@id="screener-funds"]/div/screener-show-all-button/button"#;
const TABLE_BODY: &str = r#"//*[@id="screener-funds"]/screener-table/table/tbody"#;

/// Holdings files without a `fileType` are CSV exports.
const FALLBACK_EXTENSION: &str = "csv";

#[derive(Debug, Clone, Copy, Default)]
pub struct IShares;

/// Listing table: a single unpartitioned body, ETF rows only.
pub fn listing_layout() -> ListingLayout {
    ListingLayout {
        partitions: vec![Partition {
            label: None,
            body: Locator::xpath(TABLE_BODY),
        }],
        row: "tr",
        columns: vec![
            Column::text(Field::Name, "th"),
            Column::href(Field::ProductPage, "th//a"),
            Column::text(Field::Currency, "td[2]"),
            Column::text(Field::Hedged, "td[3]"),
            Column::text(Field::Distribution, "td[4]"),
            Column::text(Field::Ter, "td[5]"),
            Column::text(Field::Date, "td[7]"),
        ],
        identifier: None,
        admission: Some(Admission {
            path: "td[1]",
            expected: "ETF",
        }),
        name_style: NameStyle::FirstLine,
    }
}

fn product_data(class: &str) -> Locator {
    Locator::xpath(format!(
        "//div[contains(@class, 'product-data-item') and contains(@class, '{class}')]//div[@class='data']"
    ))
}

/// Product page: ISIN plus price, ticker, documents and the holdings link.
pub fn detail_layout() -> DetailLayout {
    DetailLayout {
        identifier: product_data("col-isin"),
        fields: vec![
            DetailField {
                field: Field::Price,
                locator: Locator::xpath(r#"//*[@id="fundheaderTabs"]/div/div/div/ul/li[1]/span[2]"#),
                read: Read::Text,
            },
            DetailField {
                field: Field::Ticker,
                locator: product_data("col-bbeqtick"),
                read: Read::Text,
            },
            DetailField {
                field: Field::Factsheet,
                locator: Locator::xpath(r#"//*[@id="fundHeaderDocLinks"]/li[2]/a"#),
                read: Read::Attribute("href"),
            },
            DetailField {
                field: Field::Kid,
                locator: Locator::xpath(r#"//*[@id="fundHeaderDocLinks"]/li[1]/a"#),
                read: Read::Attribute("href"),
            },
            DetailField {
                field: Field::HoldingsFile,
                locator: Locator::xpath(r#"//*[@id="holdings"]/div[2]/a"#),
                read: Read::Attribute("href"),
            },
        ],
    }
}

#[async_trait]
impl Provider for IShares {
    fn name(&self) -> &'static str {
        "ishares"
    }

    fn catalog_url(&self) -> &'static str {
        CATALOG_URL
    }

    async fn dismiss_entry_banners(&self, page: &mut Page) -> HarvestResult<()> {
        dismiss_banners(
            page,
            &[("cookie", COOKIE_REJECT), ("private investor", PRIVATE_INVESTOR)],
        )
        .await?;
        Ok(())
    }

    async fn extract_catalog(
        &self,
        page: &mut Page,
        timing: &Timing,
    ) -> HarvestResult<CatalogSnapshot> {
        page.click(&Locator::xpath(VIEW_ALL), "View all").await?;
        page.settle(timing.settle_after_navigation).await;

        let provisional = extract_listing(page, &listing_layout()).await?;
        enrich(
            page,
            provisional,
            Some(&detail_layout()),
            timing.settle_after_navigation,
        )
        .await
    }

    async fn acquire_files(
        &self,
        _page: &mut Page,
        snapshot: &CatalogSnapshot,
        ctx: &AcquisitionContext,
    ) -> HarvestResult<AcquisitionReport> {
        let client = HttpClient::new(ctx.http_timeout.as_millis() as u64);
        let mut acquirer = DirectTransfer::new(client, &ctx.dir, FALLBACK_EXTENSION);
        acquire_all(&mut acquirer, snapshot, ctx.timing.transfer_pause).await
    }
}
