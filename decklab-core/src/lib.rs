//! Decklab Core: deck model, cached data loaders, quote cleaning and
//! ranking, slide builders.
//!
//! This crate contains everything between an upstream market-data endpoint
//! and an ordered list of slides:
//! - Period-keyed CSV cache with bounded retry around upstream providers
//! - Positional quote cleaning with ranks and percentile tiers
//! - Industry rollups (polars group-by) and shared slide algorithms
//! - One loader/builder pair per data source
//! - The `Render` contract implemented by the runner

pub mod data;
pub mod dataset;
pub mod deck;
pub mod quotes;
pub mod render;
pub mod rollup;
pub mod slides;
pub mod sources;
pub mod stats;
pub mod table;

pub use data::{DataError, DataLoader, FetchContext};
pub use dataset::Dataset;
pub use deck::{ChartOptions, Deck, DeckContent};
pub use render::{Render, RenderError};
pub use slides::{BuildError, SlideSet, SlidesBuilder};
pub use table::Table;
