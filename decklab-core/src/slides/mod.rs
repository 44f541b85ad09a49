//! Slide builders: turn a cleaned [`Dataset`] into decks plus chart options.

pub mod charts;
pub mod common;

use thiserror::Error;
use tracing::warn;

use crate::dataset::Dataset;
use crate::deck::{ChartOptions, Deck};

/// Decks in presentation order and the chart options they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideSet {
    pub decks: Vec<Deck>,
    pub chart_options: ChartOptions,
}

impl SlideSet {
    pub fn push(&mut self, deck: Deck) {
        self.decks.push(deck);
    }

    /// Append a chart deck and register its option under the deck's title.
    pub fn push_chart(&mut self, title: impl Into<String>, option: serde_json::Value) {
        let title = title.into();
        self.chart_options.insert(title.clone(), option);
        self.decks.push(Deck::chart(title));
    }

    /// Chart decks whose option entry is missing; empty for a well-formed set.
    pub fn dangling_charts(&self) -> Vec<&str> {
        self.decks
            .iter()
            .filter_map(|d| match &d.content {
                crate::deck::DeckContent::Chart { key } if !self.chart_options.contains_key(key) => {
                    Some(key.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{builder} expects a {expected} dataset, got {found}")]
    UnexpectedDataset {
        builder: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{builder}: rollup failed: {message}")]
    Rollup {
        builder: &'static str,
        message: String,
    },
}

/// Build contract shared by every source.
///
/// Builders are pure with respect to their input: chart options are
/// accumulated per call, never on the builder itself. Empty input yields
/// zero-row decks and a logged warning, never an error.
pub trait SlidesBuilder {
    /// Type name used by the registry.
    fn name(&self) -> &'static str;

    fn build(&self, data: Dataset) -> Result<SlideSet, BuildError>;
}

pub(crate) fn unexpected(builder: &'static str, expected: &'static str, found: &Dataset) -> BuildError {
    BuildError::UnexpectedDataset {
        builder,
        expected,
        found: found.kind(),
    }
}

pub(crate) fn warn_if_empty(builder: &'static str, data: &Dataset) {
    if data.is_empty() {
        warn!(builder, dataset = data.kind(), "building from an empty dataset");
    }
}
