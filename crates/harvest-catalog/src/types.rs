//! Core data types for provisional and canonical catalog records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named field scraped from a listing or detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Currency,
    Hedged,
    Distribution,
    Ter,
    Price,
    Date,
    Ticker,
    Factsheet,
    Kid,
    ProductPage,
    HoldingsFile,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Currency => "currency",
            Field::Hedged => "hedged",
            Field::Distribution => "distribution",
            Field::Ter => "ter",
            Field::Price => "price",
            Field::Date => "date",
            Field::Ticker => "ticker",
            Field::Factsheet => "factsheet",
            Field::Kid => "kid",
            Field::ProductPage => "product_page",
            Field::HoldingsFile => "holdings_file",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scraped values keyed by field. Missing fields are simply absent.
pub type RecordFields = BTreeMap<Field, String>;

/// A listing-page row before enrichment.
///
/// The surrogate key is assigned in listing order and is only stable within
/// one run. The natural identifier is optional until enrichment confirms it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionalRecord {
    pub surrogate_key: usize,
    pub identifier: Option<String>,
    pub partition: Option<String>,
    pub fields: RecordFields,
}

impl ProvisionalRecord {
    pub fn new(surrogate_key: usize) -> Self {
        Self {
            surrogate_key,
            identifier: None,
            partition: None,
            fields: RecordFields::new(),
        }
    }

    /// The detail-page reference, if non-empty.
    pub fn detail_page(&self) -> Option<&str> {
        self.fields
            .get(&Field::ProductPage)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Identifier for log lines: the natural identifier when known,
    /// otherwise `row-{surrogate_key}`.
    pub fn label(&self) -> String {
        match &self.identifier {
            Some(id) => id.clone(),
            None => format!("row-{}", self.surrogate_key),
        }
    }
}

/// Merge listing-page and detail-page fields. Detail values win on collision.
pub fn merge_fields(listing: &RecordFields, detail: RecordFields) -> RecordFields {
    let mut merged = listing.clone();
    merged.extend(detail);
    merged
}

/// The durable representation of one catalog entry.
///
/// The natural identifier is not a field: it is the key under which the
/// record lives in a [`CatalogSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub name: Option<String>,
    #[serde(default)]
    pub asset_class: Option<String>,
    pub currency: Option<String>,
    #[serde(default)]
    pub hedged: Option<String>,
    #[serde(default)]
    pub distribution: Option<String>,
    pub ter: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub factsheet: Option<String>,
    #[serde(default)]
    pub kid: Option<String>,
    pub product_page: String,
    #[serde(default)]
    pub holdings_file: Option<String>,
}

impl CanonicalRecord {
    /// Build a canonical record from merged fields.
    pub fn from_fields(asset_class: Option<String>, fields: &RecordFields) -> Self {
        let get = |f: Field| fields.get(&f).cloned();
        Self {
            name: get(Field::Name),
            asset_class,
            currency: get(Field::Currency),
            hedged: get(Field::Hedged),
            distribution: get(Field::Distribution),
            ter: get(Field::Ter),
            price: get(Field::Price),
            date: get(Field::Date),
            ticker: get(Field::Ticker),
            factsheet: get(Field::Factsheet),
            kid: get(Field::Kid),
            product_page: get(Field::ProductPage).unwrap_or_default(),
            holdings_file: get(Field::HoldingsFile),
        }
    }
}

/// All canonical records of one provider for one run, keyed by natural
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogSnapshot {
    records: BTreeMap<String, CanonicalRecord>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the record it replaced (last write wins).
    pub fn insert(
        &mut self,
        identifier: impl Into<String>,
        record: CanonicalRecord,
    ) -> Option<CanonicalRecord> {
        self.records.insert(identifier.into(), record)
    }

    pub fn get(&self, identifier: &str) -> Option<&CanonicalRecord> {
        self.records.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CanonicalRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Record counts per asset class; records without one count as `"-"`.
    pub fn by_asset_class(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.values() {
            let class = record.asset_class.clone().unwrap_or_else(|| "-".to_string());
            *counts.entry(class).or_insert(0) += 1;
        }
        counts
    }
}

/// How a holdings file was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// HTTP GET against the holdings-file reference.
    DirectTransfer,
    /// Click an in-page download trigger and capture the browser download.
    UiDownload,
}

/// A holdings file materialised on disk as `{identifier}.{extension}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquiredFile {
    pub identifier: String,
    pub path: std::path::PathBuf,
    pub mode: AcquisitionMode,
}
