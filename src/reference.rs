//! Reference spreadsheet loading.
//!
//! Turns the product spreadsheet into a [`ReferenceTable`] of raw cells:
//!
//! | Extension | Reader |
//! |-----------|--------|
//! | `.xlsx` | `zip` + `quick-xml` over the OOXML parts |
//! | `.csv` | `csv`, first record is the header |
//! | `.json` | `serde_json`, an array of objects |
//!
//! Interpretation of the table (which column is the id, duplicate handling)
//! belongs to [`feed_enrich_core::ReferenceIndex`].

use anyhow::{anyhow, bail, Context, Result};
use feed_enrich_core::{CellValue, ReferenceIndex, ReferenceTable};
use quick_xml::events::Event;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::config::ReferenceConfig;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 64 * 1024 * 1024;
/// Last worksheet column (`XFD`), 0-based.
const XLSX_MAX_COLUMN: usize = 16_383;
/// Maximum cells materialized from a single worksheet.
const XLSX_MAX_CELLS_PER_SHEET: usize = 2_000_000;

/// Load the configured spreadsheet and build the index from it.
pub fn load_index(config: &ReferenceConfig) -> Result<ReferenceIndex> {
    let table = load_table(&config.path, config.sheet)?;
    let index = ReferenceIndex::build(&table, &config.columns)
        .with_context(|| format!("Invalid reference data in {}", config.path.display()))?;
    Ok(index)
}

/// Read a spreadsheet into header + rows, choosing the reader by extension.
pub fn load_table(path: &Path, sheet: usize) -> Result<ReferenceTable> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read spreadsheet: {}", path.display()))?;
            read_xlsx(&bytes, sheet)
                .with_context(|| format!("Failed to parse spreadsheet: {}", path.display()))
        }
        "csv" => read_csv(path),
        "json" => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read reference file: {}", path.display()))?;
            read_json(&content)
                .with_context(|| format!("Failed to parse reference file: {}", path.display()))
        }
        other => bail!(
            "Unsupported reference format: '{}'. Must be xlsx, csv, or json.",
            other
        ),
    }
}

fn table_from_grid(grid: Vec<Vec<CellValue>>) -> ReferenceTable {
    let mut rows = grid
        .into_iter()
        .filter(|row| row.iter().any(|c| !c.is_blank()));
    let headers: Vec<String> = rows
        .next()
        .map(|row| {
            row.iter()
                .map(|c| c.to_text().trim_start_matches('\u{feff}').trim().to_string())
                .collect()
        })
        .unwrap_or_default();
    // Short rows stay short; `ReferenceTable::cell` reads missing cells as empty.
    ReferenceTable::new(headers, rows.collect())
}

// ─── CSV ────────────────────────────────────────────────────────────

fn read_csv(path: &Path) -> Result<ReferenceTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV: {}", path.display()))?;
    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed CSV: {}", path.display()))?;
        grid.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(table_from_grid(grid))
}

// ─── JSON ───────────────────────────────────────────────────────────

fn read_json(content: &str) -> Result<ReferenceTable> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let rows = value
        .as_array()
        .ok_or_else(|| anyhow!("expected a JSON array of objects"))?;

    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        let obj = row
            .as_object()
            .ok_or_else(|| anyhow!("expected a JSON array of objects"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let table_rows = rows
        .iter()
        .filter_map(|row| row.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_cell).unwrap_or_default())
                .collect()
        })
        .collect();
    Ok(ReferenceTable::new(headers, table_rows))
}

fn json_cell(value: &serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Empty,
        serde_json::Value::Bool(b) => CellValue::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(n.to_string())),
        serde_json::Value::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

// ─── XLSX ───────────────────────────────────────────────────────────

fn read_xlsx(bytes: &[u8], sheet: usize) -> Result<ReferenceTable> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
    let has_shared_strings = archive.file_names().any(|n| n == "xl/sharedStrings.xml");
    let shared_strings = if has_shared_strings {
        let xml = read_zip_entry_bounded(&mut archive, "xl/sharedStrings.xml")?;
        read_shared_strings(&xml)?
    } else {
        Vec::new()
    };
    let sheet_names = list_worksheet_names(&archive);
    let name = sheet
        .checked_sub(1)
        .and_then(|i| sheet_names.get(i))
        .ok_or_else(|| {
            anyhow!(
                "worksheet {} not found ({} worksheets present)",
                sheet,
                sheet_names.len()
            )
        })?;
    let sheet_xml = read_zip_entry_bounded(&mut archive, name)?;
    let grid = read_sheet_cells(&sheet_xml, &shared_strings)?;
    Ok(table_from_grid(grid))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>> {
    let entry = archive.by_name(name)?;
    let mut out = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut out)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        bail!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name,
            MAX_XML_ENTRY_BYTES
        );
    }
    Ok(out)
}

/// One string per `<si>`, concatenating rich-text runs.
fn read_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = current.is_some(),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(te) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().unwrap_or_default());
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.push(current.take().unwrap_or_default()),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn list_worksheet_names(archive: &zip::ZipArchive<std::io::Cursor<&[u8]>>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Column index (0-based) from a cell reference such as `AB12`.
///
/// `None` for references without letters or past column `XFD`.
fn column_from_ref(cell_ref: &str) -> Option<usize> {
    let mut col = 0usize;
    let mut letters = 0;
    for b in cell_ref.bytes().take_while(u8::is_ascii_alphabetic) {
        letters += 1;
        if letters > 3 {
            return None;
        }
        col = col * 26 + usize::from(b.to_ascii_uppercase() - b'A' + 1);
    }
    if letters == 0 || col - 1 > XLSX_MAX_COLUMN {
        return None;
    }
    Some(col - 1)
}

struct PendingCell {
    /// `None` when the reference is out of range; the cell is dropped.
    col: Option<usize>,
    kind: String,
    text: String,
}

impl PendingCell {
    fn value(&self, shared_strings: &[String]) -> CellValue {
        let raw = self.text.as_str();
        match self.kind.as_str() {
            "s" => raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared_strings.get(i))
                .map(|s| CellValue::Text(s.clone()))
                .unwrap_or_default(),
            "inlineStr" | "str" => CellValue::Text(raw.to_string()),
            "b" => CellValue::Bool(raw.trim() == "1"),
            "e" => CellValue::Empty,
            _ if raw.trim().is_empty() => CellValue::Empty,
            _ => raw
                .trim()
                .parse::<f64>()
                .map(CellValue::Number)
                .unwrap_or_else(|_| CellValue::Text(raw.to_string())),
        }
    }
}

fn read_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<Vec<Vec<CellValue>>> {
    let mut rows: BTreeMap<usize, Vec<CellValue>> = BTreeMap::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut row_idx = 0usize;
    let mut current_row: Vec<CellValue> = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut stored_cells = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = Vec::new();
                    row_idx = attr(&e, b"r")
                        .and_then(|r| r.parse::<usize>().ok())
                        .unwrap_or(row_idx + 1);
                }
                b"c" => {
                    let col = match attr(&e, b"r") {
                        Some(r) => column_from_ref(&r),
                        None => Some(current_row.len()).filter(|&c| c <= XLSX_MAX_COLUMN),
                    };
                    cell = Some(PendingCell {
                        col,
                        kind: attr(&e, b"t").unwrap_or_default(),
                        text: String::new(),
                    });
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Event::Text(te) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.text.push_str(&te.unescape().unwrap_or_default());
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        if let Some(col) = c.col {
                            if current_row.len() <= col {
                                if stored_cells + col + 1 > XLSX_MAX_CELLS_PER_SHEET {
                                    bail!(
                                        "worksheet exceeds {} cells",
                                        XLSX_MAX_CELLS_PER_SHEET
                                    );
                                }
                                current_row.resize(col + 1, CellValue::Empty);
                            }
                            current_row[col] = c.value(shared_strings);
                        }
                    }
                }
                b"row" => {
                    stored_cells += current_row.len();
                    rows.insert(row_idx, std::mem::take(&mut current_row));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows.into_values().collect())
}

fn attr(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}
