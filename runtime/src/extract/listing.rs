//! Listing-page extraction into provisional records.

use super::Read;
use crate::locator::Locator;
use crate::page::{Page, Wait};
use harvest_catalog::{Field, HarvestError, HarvestResult, ProvisionalRecord};

/// One table body of the listing, optionally labelled with an asset class.
#[derive(Debug, Clone)]
pub struct Partition {
    pub label: Option<&'static str>,
    pub body: Locator,
}

/// A field read from a fixed position relative to the row.
#[derive(Debug, Clone)]
pub struct Column {
    pub field: Field,
    pub path: &'static str,
    pub read: Read,
}

impl Column {
    pub const fn text(field: Field, path: &'static str) -> Self {
        Self {
            field,
            path,
            read: Read::Text,
        }
    }

    pub const fn href(field: Field, path: &'static str) -> Self {
        Self {
            field,
            path,
            read: Read::Attribute("href"),
        }
    }
}

/// Row-admission predicate: the text at `path` must equal `expected`.
#[derive(Debug, Clone)]
pub struct Admission {
    pub path: &'static str,
    pub expected: &'static str,
}

/// How the display name cell is normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    /// Keep only the first rendered line.
    FirstLine,
    /// Join all lines with spaces, behind a fixed prefix.
    Joined { prefix: &'static str },
}

impl NameStyle {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            NameStyle::FirstLine => raw.lines().next().unwrap_or("").trim().to_string(),
            NameStyle::Joined { prefix } => {
                let joined = raw
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{prefix}{joined}")
            }
        }
    }
}

/// Declarative description of a provider's listing table.
#[derive(Debug, Clone)]
pub struct ListingLayout {
    pub partitions: Vec<Partition>,
    /// Row element below a partition body, usually `tr`.
    pub row: &'static str,
    pub columns: Vec<Column>,
    /// Column carrying the natural identifier, when the listing exposes it.
    pub identifier: Option<&'static str>,
    pub admission: Option<Admission>,
    pub name_style: NameStyle,
}

/// Cells are read without waiting: the partition body has already rendered,
/// so an absent cell is simply empty.
async fn read_cell(page: &Page, locator: &Locator, read: Read) -> HarvestResult<String> {
    match read {
        Read::Text => page.read_text_with(locator, Wait::Immediate).await,
        Read::Attribute(attr) => page.read_attribute_with(locator, attr, Wait::Immediate).await,
    }
}

/// Read every partition of the listing into provisional records, in
/// rendered order.
///
/// Rows rejected by the admission predicate are skipped silently. Rows
/// without a detail-page reference are skipped with a warning. Missing
/// optional cells are left out of the record.
pub async fn extract_listing(
    page: &Page,
    layout: &ListingLayout,
) -> HarvestResult<Vec<ProvisionalRecord>> {
    tracing::info!(partitions = layout.partitions.len(), "Cycling through products table");
    let mut records = Vec::new();
    let mut next_key = 0usize;

    for partition in &layout.partitions {
        let partition_name = partition.label.unwrap_or("-");
        match page.locate(&partition.body, Wait::Present).await {
            Ok(_) => {}
            Err(e @ HarvestError::NotFound { .. }) => {
                tracing::error!(
                    partition = partition_name,
                    locator = %partition.body,
                    kind = e.kind(),
                    "Products table not found"
                );
                continue;
            }
            Err(e) => return Err(e),
        }

        let rows = page.count(&partition.body.join(layout.row)?).await?;
        tracing::debug!(partition = partition_name, rows, "Reading partition");

        for index in 1..=rows {
            let row = partition.body.nth(layout.row, index)?;

            if let Some(admission) = &layout.admission {
                let cell = row.join(admission.path)?;
                match read_cell(page, &cell, Read::Text).await {
                    Ok(kind) if kind == admission.expected => {}
                    Ok(_) => continue,
                    Err(e) if e.is_not_found() => continue,
                    Err(e) => return Err(e),
                }
            }

            let mut record = ProvisionalRecord::new(next_key);
            record.partition = partition.label.map(str::to_string);

            if let Some(path) = layout.identifier {
                match read_cell(page, &row.join(path)?, Read::Text).await {
                    Ok(id) if !id.is_empty() => record.identifier = Some(id),
                    Ok(_) => {}
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                }
            }

            for column in &layout.columns {
                let cell = row.join(column.path)?;
                match read_cell(page, &cell, column.read).await {
                    Ok(value) => {
                        let value = if column.field == Field::Name {
                            layout.name_style.apply(&value)
                        } else {
                            value
                        };
                        record.fields.insert(column.field, value);
                    }
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(row = index, field = %column.field, "Cell missing");
                    }
                    Err(e) => return Err(e),
                }
            }

            if record.detail_page().is_none() {
                tracing::warn!(
                    partition = partition_name,
                    row = index,
                    record = %record.label(),
                    "Row has no product page, skipping"
                );
                continue;
            }

            next_key += 1;
            records.push(record);
        }
    }

    tracing::info!(records = records.len(), "Listing extracted");
    Ok(records)
}
