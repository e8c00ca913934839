//! Title and description synthesis for feed items.
//!
//! [`compose`] is a pure function of a [`ReferenceRecord`]: it never looks at
//! what the feed item currently holds, so enriching an item twice gives the
//! same result as enriching it once.
//!
//! # Title
//!
//! `name | usage | brand | category`, joined with `" | "`. Empty segments are
//! dropped, and a segment whose lowercase text already appears inside an
//! earlier segment is dropped too (`AcmeCo Shampoo` never gets a second
//! `AcmeCo`).
//!
//! # Description
//!
//! ```text
//! Producto: <name>
//! Marca: <brand>                 (if present)
//! Categoría: <category>          (if present)
//! Uso Específico: <usage>        (if found)
//! Barcode: <barcode>             (if present)
//! ---
//! Descripción Detallada:
//! <description or "No disponible">
//! ```

use crate::index::ReferenceIndex;
use crate::models::{EnrichOutcome, FeedItem, ReferenceRecord, RunSummary};
use crate::normalize::normalize;
use crate::usage::{extract_usage, UsageDescriptor};

/// Separator between title segments.
pub const TITLE_SEPARATOR: &str = " | ";

const DESCRIPTION_FALLBACK: &str = "No disponible";

/// Title, description, and usage derived from one reference record.
#[derive(Debug, Clone, PartialEq)]
pub struct Composed {
    pub title: String,
    pub description: String,
    pub usage: Option<UsageDescriptor>,
}

/// Build the enriched title and description for a record.
pub fn compose(record: &ReferenceRecord) -> Composed {
    let name = normalize(&record.name);
    let brand = normalize(&record.brand);
    let category = normalize(&record.category);
    let barcode = normalize(&record.barcode);
    let details = normalize(&record.description);

    let usage = extract_usage(&details);
    let usage_text = usage.as_ref().map(|u| u.to_string()).unwrap_or_default();

    let title = compose_title(&[
        name.as_str(),
        usage_text.as_str(),
        brand.as_str(),
        category.as_str(),
    ]);

    let mut lines = vec![format!("Producto: {}", name)];
    if !brand.is_empty() {
        lines.push(format!("Marca: {}", brand));
    }
    if !category.is_empty() {
        lines.push(format!("Categoría: {}", category));
    }
    if !usage_text.is_empty() {
        lines.push(format!("Uso Específico: {}", usage_text));
    }
    if !barcode.is_empty() {
        lines.push(format!("Barcode: {}", barcode));
    }
    lines.push("---".to_string());
    lines.push("Descripción Detallada:".to_string());
    if details.is_empty() || details == "nan" {
        lines.push(DESCRIPTION_FALLBACK.to_string());
    } else {
        lines.push(details);
    }

    Composed {
        title,
        description: lines.join("\n"),
        usage,
    }
}

fn compose_title(candidates: &[&str]) -> String {
    let mut kept: Vec<&str> = Vec::with_capacity(candidates.len());
    let mut kept_lower: Vec<String> = Vec::with_capacity(candidates.len());
    for &segment in candidates {
        if segment.is_empty() {
            continue;
        }
        let lower = segment.to_lowercase();
        if kept_lower.iter().any(|earlier| earlier.contains(&lower)) {
            continue;
        }
        kept.push(segment);
        kept_lower.push(lower);
    }
    kept.join(TITLE_SEPARATOR)
}

/// Enrich one item in place from its matching reference record.
///
/// Items without a usable id, or whose id is not indexed, are left untouched.
pub fn enrich<I: FeedItem + ?Sized>(item: &mut I, index: &ReferenceIndex) -> EnrichOutcome {
    let record = match item.id().map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => match index.get(id) {
            Some(record) => record,
            None => return EnrichOutcome::NotFound,
        },
        None => return EnrichOutcome::MissingId,
    };

    let composed = compose(record);
    if item.has_title() {
        item.set_title(&composed.title);
    }
    item.set_description(&composed.description);
    EnrichOutcome::Enriched
}

/// Enrich every item in order and tally the outcomes.
pub fn run<I: FeedItem>(items: &mut [I], index: &ReferenceIndex) -> RunSummary {
    run_with(items, index, |_, _| {})
}

/// Like [`run`], calling `observe(position, outcome)` after each item.
pub fn run_with<I, F>(items: &mut [I], index: &ReferenceIndex, mut observe: F) -> RunSummary
where
    I: FeedItem,
    F: FnMut(usize, EnrichOutcome),
{
    let mut summary = RunSummary::default();
    for (pos, item) in items.iter_mut().enumerate() {
        let outcome = enrich(item, index);
        summary.record(outcome);
        observe(pos, outcome);
    }
    summary
}
