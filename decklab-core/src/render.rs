//! Page rendering contract.

use std::path::PathBuf;

use thiserror::Error;

use crate::deck::{ChartOptions, Deck};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template '{name}' failed: {message}")]
    Template { name: String, message: String },

    #[error("chart options could not be serialized: {0}")]
    Options(#[from] serde_json::Error),

    #[error("write failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns an ordered deck list into one page under the output directory.
///
/// Rendering the same input twice yields the same file; the write is
/// atomic so readers never observe a partial page.
pub trait Render {
    fn render_page(
        &self,
        decks: &[Deck],
        output_name: &str,
        chart_options: &ChartOptions,
    ) -> Result<PathBuf, RenderError>;
}
