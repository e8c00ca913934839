//! Reference spreadsheet inspection.
//!
//! `feed-enrich inspect` prints the columns found in the reference file,
//! which of them the configured column map resolves, and a sample of rows.
//! With `--usage` it lists rows whose description mentions skin or hair
//! usage, together with the descriptor the extractor derives from them.

use anyhow::Result;
use feed_enrich_core::{extract_usage, normalize, normalize_text, ReferenceTable};

use crate::config::Config;
use crate::reference::load_table;

/// Description keywords that suggest a usage phrase is present.
const USAGE_KEYWORDS: &[&str] = &["piel", "cabello", "cutis", "ideal para", "indicado para"];

/// Longest description excerpt printed per row.
const EXCERPT_CHARS: usize = 500;

pub fn run_inspect(config: &Config, rows: usize, usage: bool) -> Result<()> {
    let table = load_table(&config.reference.path, config.reference.sheet)?;

    println!("Columns found:");
    for header in &table.headers {
        println!("- {}", header);
    }
    println!();
    println!("{:<12} {:<20} FOUND", "FIELD", "COLUMN");
    for (field, column) in config.reference.columns.entries() {
        let found = table.column_index(column).is_some();
        println!("{:<12} {:<20} {}", field, column, found);
    }
    println!();
    println!("rows: {}", table.rows.len());

    if usage {
        print_usage_matches(config, &table, rows);
    } else {
        print_sample(&table, rows);
    }
    Ok(())
}

fn print_sample(table: &ReferenceTable, rows: usize) {
    for row in 0..rows.min(table.rows.len()) {
        println!();
        println!("--- row {} ---", row + 1);
        for (col, header) in table.headers.iter().enumerate() {
            println!("{}: {}", header, table.cell(row, Some(col)));
        }
    }
}

fn print_usage_matches(config: &Config, table: &ReferenceTable, limit: usize) {
    let columns = &config.reference.columns;
    let id_col = table.column_index(&columns.id);
    let name_col = table.column_index(&columns.name);
    let Some(desc_col) = table.column_index(&columns.description) else {
        println!("no '{}' column; nothing to scan", columns.description);
        return;
    };

    let matches = usage_matches(table, desc_col);
    if matches.is_empty() {
        println!("No matches found.");
        return;
    }
    println!("Found {} rows matching usage keywords.", matches.len());

    for row in matches.into_iter().take(limit) {
        let description = normalize(&table.cell(row, Some(desc_col)));
        let usage = extract_usage(&description)
            .map(|u| u.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!();
        println!(
            "--- ID: {} ({}) ---",
            table.cell(row, id_col),
            normalize(&table.cell(row, name_col))
        );
        println!("usage: {}", usage);
        println!("{}", excerpt(&description, EXCERPT_CHARS));
    }
}

/// Rows whose normalized description contains any usage keyword.
fn usage_matches(table: &ReferenceTable, desc_col: usize) -> Vec<usize> {
    (0..table.rows.len())
        .filter(|&row| {
            let text = normalize_text(&table.cell(row, Some(desc_col)).to_text()).to_lowercase();
            USAGE_KEYWORDS.iter().any(|k| text.contains(k))
        })
        .collect()
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
