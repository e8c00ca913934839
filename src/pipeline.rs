//! Enrichment run orchestration.
//!
//! Coordinates the full flow: reference spreadsheet → index → feed fetch →
//! XML parse → enrichment → XML write. A reference file that cannot be
//! loaded either aborts the run or, with `reference.on_error = "passthrough"`,
//! degrades to an empty index so the feed is written back unchanged.

use anyhow::Result;
use feed_enrich_core::{run_with, ReferenceIndex, RunSummary};
use std::path::{Path, PathBuf};

use crate::config::{Config, FeedSource};
use crate::feed::{FeedDocument, FieldNames};
use crate::fetch::fetch_feed;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::reference::load_index;

/// Items between two `Enriching` progress events.
const PROGRESS_EVERY: usize = 500;

pub fn run_enrich(
    config: &Config,
    dry_run: bool,
    output: Option<PathBuf>,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    progress.report(ProgressEvent::LoadingReference {
        path: config.reference.path.display().to_string(),
    });
    let index = match load_index(&config.reference) {
        Ok(index) => index,
        Err(e) if config.reference.passthrough_on_error() => {
            eprintln!(
                "warning: {:#}; continuing without enrichment (reference.on_error = passthrough)",
                e
            );
            ReferenceIndex::default()
        }
        Err(e) => return Err(e),
    };

    let source = match config.feed.source()? {
        FeedSource::Url(url) => url,
        FeedSource::Path(path) => path.display().to_string(),
    };
    progress.report(ProgressEvent::FetchingFeed { source });
    let bytes = fetch_feed(&config.feed)?;

    let names = FieldNames::from_config(&config.feed);
    let (doc, summary) = enrich_feed(&bytes, &index, &names, progress)?;

    let output_path = output.unwrap_or_else(|| config.output.path.clone());
    if !dry_run {
        doc.write_to_file(&output_path)?;
    }

    progress.report(ProgressEvent::Finished(summary));
    print_report(&index, &summary, &output_path, dry_run);
    Ok(summary)
}

/// Parse a feed and enrich every item in document order.
pub fn enrich_feed(
    bytes: &[u8],
    index: &ReferenceIndex,
    names: &FieldNames,
    progress: &dyn ProgressReporter,
) -> Result<(FeedDocument, RunSummary)> {
    let mut doc = FeedDocument::parse(bytes, names)?;
    let total = doc.items().len();

    let summary = run_with(doc.items_mut(), index, |pos, _| {
        let n = pos + 1;
        if n % PROGRESS_EVERY == 0 || n == total {
            progress.report(ProgressEvent::Enriching {
                n: n as u64,
                total: total as u64,
            });
        }
    });

    Ok((doc, summary))
}

fn print_report(index: &ReferenceIndex, summary: &RunSummary, output: &Path, dry_run: bool) {
    let stats = index.stats();
    if dry_run {
        println!("enrich (dry-run)");
    } else {
        println!("enrich");
    }
    println!("  reference records: {}", index.len());
    if stats.duplicates > 0 {
        println!("  duplicate ids (last wins): {}", stats.duplicates);
    }
    if stats.skipped > 0 {
        println!("  rows without id: {}", stats.skipped);
    }
    println!("  items: {}", summary.total);
    println!("  enriched: {}", summary.enriched);
    println!("  not found: {}", summary.not_found);
    println!("  missing id: {}", summary.missing_id);
    if !dry_run {
        println!("  output: {}", output.display());
    }
    println!("ok");
}
