//! Identifier-to-record lookup over the reference spreadsheet.
//!
//! [`ReferenceIndex::build`] turns a loaded [`ReferenceTable`] into a
//! `HashMap` keyed by the textual form of each row's identifier. The index is
//! built once per run and only read during enrichment.
//!
//! # Duplicate identifiers
//!
//! When the same id appears on several rows, the last row wins. Overwrites
//! are counted in [`IndexStats::duplicates`] so callers can surface them.
//!
//! # Missing identifiers
//!
//! Rows whose id cell is blank are skipped and counted in
//! [`IndexStats::skipped`]; they never fail the build.

use std::collections::HashMap;

use crate::models::{CellValue, ColumnMap, ReferenceRecord, ReferenceTable};

/// Reference data could not be interpreted as rows with an id column.
#[derive(Debug, Clone, PartialEq)]
pub enum DataLoadError {
    /// The table has no header row at all.
    EmptyHeader,
    /// The configured identifier column is not among the headers.
    MissingColumn(String),
}

impl std::fmt::Display for DataLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataLoadError::EmptyHeader => write!(f, "reference data has no header row"),
            DataLoadError::MissingColumn(col) => {
                write!(f, "reference data has no '{}' column", col)
            }
        }
    }
}

impl std::error::Error for DataLoadError {}

/// Counters gathered while building an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexStats {
    /// Data rows read from the table.
    pub rows: usize,
    /// Rows dropped because their id was blank.
    pub skipped: usize,
    /// Rows that replaced an earlier record with the same id.
    pub duplicates: usize,
}

/// Read-only map from identifier to [`ReferenceRecord`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    records: HashMap<String, ReferenceRecord>,
    stats: IndexStats,
}

impl ReferenceIndex {
    /// Build an index from a loaded table using the given column names.
    ///
    /// Only the id column is required; any other missing column reads as
    /// empty for every row.
    pub fn build(table: &ReferenceTable, columns: &ColumnMap) -> Result<Self, DataLoadError> {
        if table.headers.iter().all(|h| h.trim().is_empty()) {
            return Err(DataLoadError::EmptyHeader);
        }
        let id_col = table
            .column_index(&columns.id)
            .ok_or_else(|| DataLoadError::MissingColumn(columns.id.clone()))?;

        let name_col = table.column_index(&columns.name);
        let brand_col = table.column_index(&columns.brand);
        let category_col = table.column_index(&columns.category);
        let sku_col = table.column_index(&columns.sku);
        let barcode_col = table.column_index(&columns.barcode);
        let description_col = table.column_index(&columns.description);

        let records = (0..table.rows.len()).map(|row| {
            let id = table.cell(row, Some(id_col));
            (
                id,
                ReferenceRecord {
                    id: String::new(),
                    name: table.cell(row, name_col),
                    brand: table.cell(row, brand_col),
                    category: table.cell(row, category_col),
                    sku: table.cell(row, sku_col),
                    barcode: table.cell(row, barcode_col),
                    description: table.cell(row, description_col),
                },
            )
        });

        Ok(Self::from_rows(records))
    }

    /// Build an index from `(raw id, record)` pairs in input order.
    ///
    /// The record's own `id` is replaced by the textual form of the raw id.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (CellValue, ReferenceRecord)>,
    {
        let mut index = Self::default();
        for (raw_id, mut record) in rows {
            index.stats.rows += 1;
            let key = match id_key(&raw_id) {
                Some(k) => k,
                None => {
                    index.stats.skipped += 1;
                    continue;
                }
            };
            record.id = key.clone();
            if index.records.insert(key, record).is_some() {
                index.stats.duplicates += 1;
            }
        }
        index
    }

    /// Look up a record by a raw (possibly non-string) id.
    pub fn lookup(&self, id: &CellValue) -> Option<&ReferenceRecord> {
        id_key(id).and_then(|k| self.records.get(&k))
    }

    /// Look up a record by its textual id. Surrounding whitespace is ignored.
    pub fn get(&self, id: &str) -> Option<&ReferenceRecord> {
        self.records.get(id.trim())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }
}

fn id_key(raw: &CellValue) -> Option<String> {
    if raw.is_blank() {
        return None;
    }
    let key = raw.to_text().trim().to_string();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
