//! Fetch → build → render for one source.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

use decklab_core::{BuildError, DataError, DataLoader, Render, RenderError, SlidesBuilder};

use crate::registry::ResolutionError;

/// Pipeline stages, entered strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Building,
    Rendering,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Fetching => "fetching",
            Stage::Building => "building",
            Stage::Rendering => "rendering",
        })
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("{source_id}: fetching failed")]
    Fetch {
        source_id: String,
        #[source]
        source: DataError,
    },

    #[error("{source_id}: building failed")]
    Build {
        source_id: String,
        #[source]
        source: BuildError,
    },

    #[error("{source_id}: rendering failed")]
    Render {
        source_id: String,
        #[source]
        source: RenderError,
    },
}

impl PipelineError {
    /// Stage that failed; `None` when the pipeline never started.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Resolution(_) => None,
            PipelineError::Fetch { .. } => Some(Stage::Fetching),
            PipelineError::Build { .. } => Some(Stage::Building),
            PipelineError::Render { .. } => Some(Stage::Rendering),
        }
    }
}

/// A resolved loader/builder pair for one source.
pub struct SlidePipeline {
    source_id: String,
    loader: Box<dyn DataLoader>,
    builder: Box<dyn SlidesBuilder>,
}

impl SlidePipeline {
    pub fn new(
        source_id: impl Into<String>,
        loader: Box<dyn DataLoader>,
        builder: Box<dyn SlidesBuilder>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            loader,
            builder,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn loader_name(&self) -> &'static str {
        self.loader.name()
    }

    pub fn builder_name(&self) -> &'static str {
        self.builder.name()
    }

    /// Run all three stages; the first failure is terminal.
    pub fn run(&self, render: &dyn Render, output_name: &str) -> Result<PathBuf, PipelineError> {
        let source_id = self.source_id.as_str();

        info!(source_id, stage = %Stage::Fetching, loader = self.loader.name(), "stage started");
        let data = self.loader.clean(source_id).map_err(|source| {
            self.fail(PipelineError::Fetch {
                source_id: source_id.into(),
                source,
            })
        })?;

        info!(source_id, stage = %Stage::Building, builder = self.builder.name(), rows = data.len(), "stage started");
        let set = self.builder.build(data).map_err(|source| {
            self.fail(PipelineError::Build {
                source_id: source_id.into(),
                source,
            })
        })?;

        info!(
            source_id,
            stage = %Stage::Rendering,
            decks = set.decks.len(),
            charts = set.chart_options.len(),
            "stage started"
        );
        let path = render
            .render_page(&set.decks, output_name, &set.chart_options)
            .map_err(|source| {
                self.fail(PipelineError::Render {
                    source_id: source_id.into(),
                    source,
                })
            })?;

        info!(source_id, path = %path.display(), "pipeline finished");
        Ok(path)
    }

    fn fail(&self, e: PipelineError) -> PipelineError {
        let cause = std::error::Error::source(&e)
            .map(|s| s.to_string())
            .unwrap_or_default();
        error!(source_id = %self.source_id, stage = ?e.stage(), error = %e, cause = %cause, "pipeline failed");
        e
    }
}
