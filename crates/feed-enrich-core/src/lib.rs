//! # Feed Enrich Core
//!
//! Pure enrichment logic for Feed Enrich: data models, text normalization,
//! usage extraction, the reference index, and item enrichment.
//!
//! This crate contains no network, filesystem, or XML dependencies. Feed
//! items reach the engine through the [`models::FeedItem`] trait and
//! reference rows arrive as an already-loaded [`models::ReferenceTable`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Cell values, reference records, feed item seam, run summary |
//! | [`normalize`] | Markup stripping and whitespace collapsing |
//! | [`usage`] | Skin/hair usage descriptor extraction |
//! | [`index`] | Identifier-to-record lookup |
//! | [`enrich`] | Title/description composition and the batch run |

pub mod enrich;
pub mod index;
pub mod models;
pub mod normalize;
pub mod usage;

pub use enrich::{compose, enrich, run, run_with, Composed, TITLE_SEPARATOR};
pub use index::{DataLoadError, IndexStats, ReferenceIndex};
pub use models::{
    CellValue, ColumnMap, EnrichOutcome, FeedItem, Product, ReferenceRecord, ReferenceTable,
    RunSummary,
};
pub use normalize::{normalize, normalize_text};
pub use usage::{extract_usage, UsageCategory, UsageDescriptor};
