//! Core data models used throughout Feed Enrich.
//!
//! These types represent the spreadsheet cells, reference records, and feed
//! items that flow through the enrichment pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single spreadsheet value as handed over by a reference loader.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// True for [`CellValue::Empty`], NaN, and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
            CellValue::Bool(_) => false,
        }
    }

    /// Textual representation; absent values render as the empty string.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) if n.is_nan() => Ok(()),
            // Integral numbers keep their integer form so ids like 2392180 match.
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Rows of raw cells under a header, as produced by a spreadsheet loader.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ReferenceTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    /// Position of a header, compared trimmed and case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }

    /// Cell at `(row, col)`; cells past the end of a short row are empty.
    pub fn cell(&self, row: usize, col: Option<usize>) -> CellValue {
        col.and_then(|c| self.rows.get(row).and_then(|r| r.get(c)))
            .cloned()
            .unwrap_or_default()
    }
}

/// Column names holding each reference field.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ColumnMap {
    #[serde(default = "default_id")]
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_brand")]
    pub brand: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_sku")]
    pub sku: String,
    #[serde(default = "default_barcode")]
    pub barcode: String,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_id() -> String {
    "Id".to_string()
}
fn default_name() -> String {
    "Nombre".to_string()
}
fn default_brand() -> String {
    "Marca".to_string()
}
fn default_category() -> String {
    "Categoria".to_string()
}
fn default_sku() -> String {
    "SKU".to_string()
}
fn default_barcode() -> String {
    "Barcode".to_string()
}
fn default_description() -> String {
    "Descripcion".to_string()
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: default_id(),
            name: default_name(),
            brand: default_brand(),
            category: default_category(),
            sku: default_sku(),
            barcode: default_barcode(),
            description: default_description(),
        }
    }
}

impl ColumnMap {
    /// All configured column names with their field labels.
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("id", &self.id),
            ("name", &self.name),
            ("brand", &self.brand),
            ("category", &self.category),
            ("sku", &self.sku),
            ("barcode", &self.barcode),
            ("description", &self.description),
        ]
    }
}

/// One row of authoritative product data. Immutable once indexed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceRecord {
    pub id: String,
    pub name: CellValue,
    pub brand: CellValue,
    pub category: CellValue,
    pub sku: CellValue,
    pub barcode: CellValue,
    pub description: CellValue,
}

/// A product entry owned by the feed document.
///
/// The engine only reads the identifier and writes title/description back;
/// it never creates, removes, or reorders items.
pub trait FeedItem {
    /// Raw identifier, if the item carries one.
    fn id(&self) -> Option<&str>;

    /// Whether the item already exposes a title field.
    fn has_title(&self) -> bool;

    /// Overwrite the existing title. Only called when [`has_title`](FeedItem::has_title) is true.
    fn set_title(&mut self, title: &str);

    /// Overwrite the description, creating the field when absent.
    fn set_description(&mut self, description: &str);
}

/// In-memory feed item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Product {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Product {
    pub fn new(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

impl FeedItem for Product {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn has_title(&self) -> bool {
        self.title.is_some()
    }

    fn set_title(&mut self, title: &str) {
        if let Some(existing) = self.title.as_mut() {
            *existing = title.to_string();
        }
    }

    fn set_description(&mut self, description: &str) {
        self.description = Some(description.to_string());
    }
}

/// Result of enriching a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// A reference record matched and title/description were rewritten.
    Enriched,
    /// The id has no reference record; the item is untouched.
    NotFound,
    /// The item has no usable id; it is skipped.
    MissingId,
}

impl EnrichOutcome {
    pub fn is_enriched(&self) -> bool {
        matches!(self, EnrichOutcome::Enriched)
    }
}

/// Counts reported after a batch run.
///
/// `enriched + not_found + missing_id == total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub enriched: usize,
    pub not_found: usize,
    pub missing_id: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: EnrichOutcome) {
        self.total += 1;
        match outcome {
            EnrichOutcome::Enriched => self.enriched += 1,
            EnrichOutcome::NotFound => self.not_found += 1,
            EnrichOutcome::MissingId => self.missing_id += 1,
        }
    }
}
