//! Output feed verification.
//!
//! `feed-enrich verify <ID>` re-reads a written feed, finds the item with
//! that id, and prints its title with every `|` position and its neighbours
//! so separator problems are visible at a glance.

use anyhow::{Context, Result};
use feed_enrich_core::{FeedItem, TITLE_SEPARATOR};
use std::path::Path;

use crate::feed::{FeedDocument, FieldNames};

/// A `|` in a title and the characters around it.
#[derive(Debug, Clone, PartialEq)]
pub struct PipePosition {
    pub index: usize,
    pub before: Option<char>,
    pub after: Option<char>,
}

/// Character positions of every `|` in `title`.
pub fn pipe_positions(title: &str) -> Vec<PipePosition> {
    let chars: Vec<char> = title.chars().collect();
    chars
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == '|')
        .map(|(i, _)| PipePosition {
            index: i,
            before: i.checked_sub(1).map(|j| chars[j]),
            after: chars.get(i + 1).copied(),
        })
        .collect()
}

/// True when every `|` in the title is part of a `" | "` separator.
pub fn separators_ok(title: &str) -> bool {
    let pipes = pipe_positions(title).len();
    pipes == title.matches(TITLE_SEPARATOR).count()
}

pub fn run_verify(file: &Path, names: &FieldNames, id: &str) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read feed: {}", file.display()))?;
    let doc = FeedDocument::parse(&bytes, names)?;

    println!("Verifying item {} in {}", id, file.display());
    let Some(item) = doc.items().iter().find(|item| item.id() == Some(id.trim())) else {
        println!("Item {} not found in feed.", id);
        return Ok(());
    };

    let title = item.title().unwrap_or_default();
    println!();
    println!("--- Item {} ---", id);
    println!("Title: {:?}", title);
    for pipe in pipe_positions(title) {
        println!(
            "Pipe at {}: '{}' | '{}'",
            pipe.index,
            pipe.before
                .map(String::from)
                .unwrap_or_else(|| "START".to_string()),
            pipe.after
                .map(String::from)
                .unwrap_or_else(|| "END".to_string())
        );
    }
    if separators_ok(title) {
        println!("PASS: all separators are {:?}", TITLE_SEPARATOR);
    } else {
        println!("FAIL: found a '|' outside a {:?} separator", TITLE_SEPARATOR);
    }

    if let Some(description) = item.description() {
        println!();
        println!("Description:");
        println!("{}", description);
    }
    Ok(())
}
