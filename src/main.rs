//! # Feed Enrich CLI (`feed-enrich`)
//!
//! ## Usage
//!
//! ```bash
//! feed-enrich --config ./config/feed-enrich.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `feed-enrich run` | Load the reference spreadsheet, fetch the feed, enrich it, write the output |
//! | `feed-enrich inspect` | Show spreadsheet columns, sample rows, or usage matches |
//! | `feed-enrich verify <id>` | Print one item's title separators from a written feed |
//!
//! ## Examples
//!
//! ```bash
//! # Enrich and write to the configured output path
//! feed-enrich run --config ./config/feed-enrich.toml
//!
//! # Show counts without writing anything
//! feed-enrich run --dry-run
//!
//! # List spreadsheet rows that mention a skin or hair type
//! feed-enrich inspect --usage --rows 5
//!
//! # Check the separators of item 2392180 in the output feed
//! feed-enrich verify 2392180
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use feed_enrich::config;
use feed_enrich::feed::FieldNames;
use feed_enrich::inspect;
use feed_enrich::pipeline;
use feed_enrich::progress::ProgressMode;
use feed_enrich::verify;

/// Feed Enrich CLI — rewrites product feed titles and descriptions from an
/// authoritative product spreadsheet.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/feed-enrich.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "feed-enrich",
    about = "Feed Enrich — enrich a product XML feed from a product spreadsheet",
    version,
    long_about = "Feed Enrich matches every item of a product XML feed against an \
    authoritative spreadsheet by id, and rewrites titles and descriptions with brand, \
    category, and skin/hair usage facts, avoiding repeated information."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/feed-enrich.toml`. Feed, reference, and output
    /// settings are read from this file.
    #[arg(long, global = true, default_value = "./config/feed-enrich.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Enrich the feed.
    ///
    /// Loads the reference spreadsheet, fetches the feed, rewrites the
    /// title and description of every item whose id is in the spreadsheet,
    /// and writes the result. Items are never added, removed, or reordered.
    Run {
        /// Dry run — show counts without writing the output feed.
        #[arg(long)]
        dry_run: bool,

        /// Write to this path instead of `[output].path`.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Progress on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a terminal, otherwise `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Inspect the reference spreadsheet.
    ///
    /// Prints the columns found, whether each configured column resolves,
    /// and a sample of rows.
    Inspect {
        /// Number of rows to print.
        #[arg(long, default_value_t = 1)]
        rows: usize,

        /// List rows whose description mentions skin or hair usage,
        /// with the usage descriptor extracted from each.
        #[arg(long)]
        usage: bool,
    },

    /// Verify one item of a written feed.
    ///
    /// Prints the item's title, every `|` position with its neighbours,
    /// and whether all separators are well formed.
    Verify {
        /// Item id to look up.
        id: String,

        /// Feed file to read. Defaults to `[output].path`.
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            dry_run,
            output,
            progress,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::detect);
            let reporter = mode.reporter();
            pipeline::run_enrich(&cfg, dry_run, output, reporter.as_ref())?;
        }
        Commands::Inspect { rows, usage } => {
            inspect::run_inspect(&cfg, rows, usage)?;
        }
        Commands::Verify { id, file } => {
            let file = file.unwrap_or_else(|| cfg.output.path.clone());
            let names = FieldNames::from_config(&cfg.feed);
            verify::run_verify(&file, &names, &id)?;
        }
    }

    Ok(())
}
