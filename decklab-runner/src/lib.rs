//! Decklab Runner: pipeline orchestration on top of `decklab-core`.
//!
//! - Settings from `decklab.toml` plus environment overrides
//! - Convention-based registry of loaders and builders
//! - Fetch → build → render pipelines with stage-tagged errors
//! - Handlebars HTML renderer and the index page
//! - Batch refresh honouring each pipeline's refresh interval

pub mod batch;
pub mod config;
pub mod html;
pub mod index;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod templates;

pub use batch::{run_all, BatchSummary};
pub use config::{ConfigError, Settings};
pub use html::HtmlRender;
pub use index::{rebuild_index, IndexEntry};
pub use pipeline::{PipelineError, SlidePipeline, Stage};
pub use registry::{BuildContext, Refresh, Registry, ResolutionError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn settings_is_send_sync() {
        assert_send::<Settings>();
        assert_sync::<Settings>();
    }

    #[test]
    fn html_render_is_send_sync() {
        assert_send::<HtmlRender>();
        assert_sync::<HtmlRender>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<PipelineError>();
        assert_sync::<PipelineError>();
        assert_send::<ConfigError>();
    }
}
