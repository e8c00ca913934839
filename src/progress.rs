//! Run progress on stderr.
//!
//! `feed-enrich run` announces each phase (reference load, feed fetch,
//! enrichment) and closes with the run summary. Everything goes to
//! **stderr**; stdout carries only the final report.
//!
//! | Mode | Output |
//! |------|--------|
//! | `off` | nothing |
//! | `human` | `enrich  enriching  1,500 / 12,000 items` |
//! | `json` | one object per line, `{"event":"progress","phase":"enriching",...}` |

use clap::ValueEnum;
use feed_enrich_core::RunSummary;
use serde_json::{json, Value};
use std::io::Write;

/// Something worth telling the operator about during a run.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    LoadingReference { path: String },
    FetchingFeed { source: String },
    /// `n` of `total` feed items processed.
    Enriching { n: u64, total: u64 },
    /// The run finished; emitted once, after the output is written.
    Finished(RunSummary),
}

pub trait ProgressReporter {
    fn report(&self, event: ProgressEvent);
}

/// Aligned one-line messages for a terminal.
pub struct HumanProgress;

impl ProgressReporter for HumanProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match event {
            ProgressEvent::LoadingReference { path } => format!("reference  {}", path),
            ProgressEvent::FetchingFeed { source } => format!("feed       {}", source),
            ProgressEvent::Enriching { n, total } => format!(
                "enriching  {} / {} items",
                thousands(n),
                thousands(total)
            ),
            ProgressEvent::Finished(summary) => format!(
                "done       {} of {} items enriched",
                thousands(summary.enriched as u64),
                thousands(summary.total as u64)
            ),
        };
        emit(&format!("enrich  {}", line));
    }
}

/// JSON lines for scripts and log collectors.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&json_event(&event)) {
            emit(&line);
        }
    }
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn json_event(event: &ProgressEvent) -> Value {
    match event {
        ProgressEvent::LoadingReference { path } => {
            json!({ "event": "progress", "phase": "loading_reference", "path": path })
        }
        ProgressEvent::FetchingFeed { source } => {
            json!({ "event": "progress", "phase": "fetching_feed", "source": source })
        }
        ProgressEvent::Enriching { n, total } => {
            json!({ "event": "progress", "phase": "enriching", "n": n, "total": total })
        }
        ProgressEvent::Finished(summary) => json!({ "event": "summary", "summary": summary }),
    }
}

fn emit(line: &str) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", line);
    let _ = stderr.flush();
}

/// `1234567` → `1,234,567`.
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Value of `run --progress`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// `human` when stderr is a terminal, `off` when it is redirected.
    pub fn detect() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(HumanProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
