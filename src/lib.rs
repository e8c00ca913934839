//! # Feed Enrich
//!
//! Enriches a retailer's product XML feed with titles and descriptions
//! synthesized from an authoritative product spreadsheet, so shopping-feed
//! consumers (search and AI bots) get richer, deduplicated product text.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ Spreadsheet  │──▶│  Reference   │
//! │ xlsx/csv/json│   │    Index     │──┐
//! └──────────────┘   └──────────────┘  │   ┌──────────┐   ┌──────────┐
//!                                      ├──▶│ Enricher │──▶│ XML feed │
//! ┌──────────────┐   ┌──────────────┐  │   │  (core)  │   │  output  │
//! │  Feed (HTTP  │──▶│  Feed XML    │──┘   └──────────┘   └──────────┘
//! │   or file)   │   │  document    │
//! └──────────────┘   └──────────────┘
//! ```
//!
//! The enrichment logic itself lives in [`feed_enrich_core`]; this crate adds
//! the collaborators around it.
//!
//! ## Quick Start
//!
//! ```bash
//! feed-enrich inspect --usage          # check spreadsheet columns
//! feed-enrich run                      # fetch, enrich, write output
//! feed-enrich verify 2392180           # check one item in the output
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`fetch`] | Feed download or local read |
//! | [`feed`] | Feed XML parse and write |
//! | [`reference`] | Spreadsheet loading |
//! | [`pipeline`] | The `run` command |
//! | [`progress`] | Progress reporting on stderr |
//! | [`inspect`] | The `inspect` command |
//! | [`verify`] | The `verify` command |

pub mod config;
pub mod feed;
pub mod fetch;
pub mod inspect;
pub mod pipeline;
pub mod progress;
pub mod reference;
pub mod verify;
