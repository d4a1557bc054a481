//! Detail-page enrichment of provisional records into the canonical
//! snapshot.

use super::Read;
use crate::locator::Locator;
use crate::page::Page;
use harvest_catalog::{
    merge_fields, CanonicalRecord, CatalogSnapshot, Field, HarvestError, HarvestResult,
    ProvisionalRecord, RecordFields,
};
use std::time::Duration;

/// A field read from an absolute position on the detail page.
#[derive(Debug, Clone)]
pub struct DetailField {
    pub field: Field,
    pub locator: Locator,
    pub read: Read,
}

/// Declarative description of a provider's per-record detail page.
#[derive(Debug, Clone)]
pub struct DetailLayout {
    /// Where the natural identifier is rendered. Required.
    pub identifier: Locator,
    pub fields: Vec<DetailField>,
}

/// Visit a detail page and read whatever it offers.
///
/// Returns the identifier (if found) and the optional fields that were
/// present.
async fn scrape_detail(
    page: &mut Page,
    url: &str,
    layout: &DetailLayout,
    settle: Duration,
) -> HarvestResult<(Option<String>, RecordFields)> {
    page.navigate(url).await?;
    page.settle(settle).await;

    let identifier = match page.read_text(&layout.identifier).await {
        Ok(id) if !id.is_empty() => Some(id),
        Ok(_) => None,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::debug!(url, kind = e.kind(), "Identifier not rendered");
            None
        }
    };

    let mut fields = RecordFields::new();
    for detail in &layout.fields {
        let value = match detail.read {
            Read::Text => page.read_text(&detail.locator).await,
            Read::Attribute(attr) => page.read_attribute(&detail.locator, attr).await,
        };
        match value {
            Ok(v) => {
                fields.insert(detail.field, v);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(url, field = %detail.field, kind = e.kind(), "Optional field missing");
            }
        }
    }

    Ok((identifier, fields))
}

/// Turn provisional records into the canonical snapshot.
///
/// With a detail layout, every record's detail page is visited in order
/// and its fields are merged over the listing fields (detail wins). Records
/// that end up without a natural identifier are dropped and logged.
/// Duplicate identifiers keep the last record and log the collision.
pub async fn enrich(
    page: &mut Page,
    provisional: Vec<ProvisionalRecord>,
    layout: Option<&DetailLayout>,
    settle: Duration,
) -> HarvestResult<CatalogSnapshot> {
    let total = provisional.len();
    let mut snapshot = CatalogSnapshot::new();
    let mut dropped = 0usize;

    for record in provisional {
        let mut identifier = record.identifier.clone();
        let mut fields = record.fields.clone();

        if let Some(layout) = layout {
            let Some(url) = record.detail_page().map(str::to_string) else {
                dropped += 1;
                let err = HarvestError::MissingReference {
                    record: record.label(),
                    field: "product_page",
                };
                tracing::error!(record = %record.label(), kind = err.kind(), "{err}");
                continue;
            };
            let (detail_id, detail_fields) = scrape_detail(page, &url, layout, settle).await?;
            if detail_id.is_some() {
                identifier = detail_id;
            }
            fields = merge_fields(&fields, detail_fields);
        }

        let Some(identifier) = identifier.filter(|id| !id.is_empty()) else {
            dropped += 1;
            let err = HarvestError::UnidentifiableRecord {
                record: record.label(),
            };
            tracing::error!(
                record = %record.label(),
                url = record.detail_page().unwrap_or(""),
                kind = err.kind(),
                "{err}"
            );
            continue;
        };

        let canonical = CanonicalRecord::from_fields(record.partition.clone(), &fields);
        if snapshot.insert(identifier.clone(), canonical).is_some() {
            tracing::warn!(identifier = %identifier, "Duplicate identifier, keeping the last record");
        }
    }

    tracing::info!(provisional = total, canonical = snapshot.len(), dropped, "Catalog enriched");
    Ok(snapshot)
}
