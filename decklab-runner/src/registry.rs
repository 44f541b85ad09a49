//! Source registry: pipeline names, refresh intervals and the loader and
//! builder factories resolved by naming convention.
//!
//! A pipeline named `sw_indu` resolves to the loader registered as
//! `SwInduLoader` and the builder registered as `SwInduBuilder`. The names
//! are only keys; factories are registered explicitly.

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use decklab_core::data::DataError;
use decklab_core::slides::common::ExclusionFilter;
use decklab_core::sources::{
    Cidx399317Builder, Cidx399317Loader, CnNewsBuilder, CnNewsLoader, EmNewsBuilder,
    EmNewsLoader, SpotEmBuilder, SpotEmLoader, SwInduBuilder, SwInduLoader, WatchlistBuilder,
    WatchlistLoader,
};
use decklab_core::{DataLoader, SlidesBuilder};

use crate::config::Settings;
use crate::pipeline::{PipelineError, SlidePipeline};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("pipeline '{pipeline}' needs a loader named {expected} (module {module}), none is registered")]
    MissingLoader {
        pipeline: String,
        module: String,
        expected: String,
    },

    #[error("pipeline '{pipeline}' needs a builder named {expected} (module {module}), none is registered")]
    MissingBuilder {
        pipeline: String,
        module: String,
        expected: String,
    },

    #[error("unknown pipeline '{0}'")]
    UnknownPipeline(String),
}

/// How often a pipeline's output is expected to be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Hourly,
    Daily,
    Monthly,
}

impl Refresh {
    pub fn interval(self) -> Duration {
        match self {
            Refresh::Hourly => Duration::hours(1),
            Refresh::Daily => Duration::days(1),
            Refresh::Monthly => Duration::days(30),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Refresh::Hourly => "hourly",
            Refresh::Daily => "daily",
            Refresh::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    pub name: String,
    pub refresh: Refresh,
}

/// Everything a factory may read when constructing its loader or builder.
pub struct BuildContext<'a> {
    pub settings: &'a Settings,
    pub date: NaiveDate,
}

pub type LoaderFactory = Box<dyn Fn(&BuildContext) -> Result<Box<dyn DataLoader>, DataError>>;
pub type BuilderFactory = Box<dyn Fn(&BuildContext) -> Box<dyn SlidesBuilder>>;

/// Loader and builder type names for a pipeline name:
/// `sw_indu` → (`SwInduLoader`, `SwInduBuilder`).
pub fn convention_names(source_id: &str) -> (String, String) {
    let stem: String = source_id
        .split(|c| c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    (format!("{stem}Loader"), format!("{stem}Builder"))
}

fn module_path(source_id: &str) -> String {
    format!("decklab_core::sources::{source_id}")
}

#[derive(Default)]
pub struct Registry {
    pipelines: Vec<PipelineSpec>,
    loaders: HashMap<String, LoaderFactory>,
    builders: HashMap<String, BuilderFactory>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pipeline(&mut self, name: impl Into<String>, refresh: Refresh) {
        let name = name.into();
        self.pipelines.retain(|p| p.name != name);
        self.pipelines.push(PipelineSpec { name, refresh });
    }

    pub fn register_loader(
        &mut self,
        type_name: impl Into<String>,
        factory: impl Fn(&BuildContext) -> Result<Box<dyn DataLoader>, DataError> + 'static,
    ) {
        self.loaders.insert(type_name.into(), Box::new(factory));
    }

    pub fn register_builder(
        &mut self,
        type_name: impl Into<String>,
        factory: impl Fn(&BuildContext) -> Box<dyn SlidesBuilder> + 'static,
    ) {
        self.builders.insert(type_name.into(), Box::new(factory));
    }

    /// Registered pipelines in registration order.
    pub fn pipelines(&self) -> &[PipelineSpec] {
        &self.pipelines
    }

    pub fn spec(&self, name: &str) -> Option<&PipelineSpec> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    /// Look up both factories for `source_id` and construct the pipeline.
    pub fn resolve(&self, source_id: &str, ctx: &BuildContext) -> Result<SlidePipeline, PipelineError> {
        if self.spec(source_id).is_none() {
            return Err(ResolutionError::UnknownPipeline(source_id.to_string()).into());
        }
        let (loader_name, builder_name) = convention_names(source_id);

        let loader_factory =
            self.loaders
                .get(&loader_name)
                .ok_or_else(|| ResolutionError::MissingLoader {
                    pipeline: source_id.to_string(),
                    module: module_path(source_id),
                    expected: loader_name.clone(),
                })?;
        let builder_factory =
            self.builders
                .get(&builder_name)
                .ok_or_else(|| ResolutionError::MissingBuilder {
                    pipeline: source_id.to_string(),
                    module: module_path(source_id),
                    expected: builder_name.clone(),
                })?;

        let loader = loader_factory(ctx).map_err(|source| PipelineError::Fetch {
            source_id: source_id.to_string(),
            source,
        })?;
        debug!(source_id, loader = %loader_name, builder = %builder_name, "pipeline resolved");
        Ok(SlidePipeline::new(source_id, loader, builder_factory(ctx)))
    }

    /// The six built-in sources.
    pub fn with_defaults() -> Self {
        let mut r = Self::new();

        r.register_pipeline("spot_em", Refresh::Daily);
        r.register_pipeline("em_news", Refresh::Hourly);
        r.register_pipeline("sw_indu", Refresh::Daily);
        r.register_pipeline("cidx399317", Refresh::Monthly);
        r.register_pipeline("cn_news", Refresh::Hourly);
        r.register_pipeline("watchlist", Refresh::Daily);

        r.register_loader("SpotEmLoader", |ctx| {
            let s = ctx.settings;
            let loader = SpotEmLoader::connect(
                &s.http_options(),
                &s.endpoints.spot_quotes,
                s.fetch_context(ctx.date),
            )?;
            Ok(Box::new(loader) as Box<dyn DataLoader>)
        });
        r.register_builder("SpotEmBuilder", |ctx| {
            let filter = ExclusionFilter::new(ctx.settings.exclude_terms.clone());
            Box::new(
                SpotEmBuilder::new(ctx.date)
                    .with_top_n(ctx.settings.top_n)
                    .with_filter(filter),
            )
        });

        r.register_loader("EmNewsLoader", |ctx| {
            let s = ctx.settings;
            let loader = EmNewsLoader::connect(
                &s.http_options(),
                &s.endpoints.fast_news,
                s.fetch_context(ctx.date),
            )?;
            Ok(Box::new(loader) as Box<dyn DataLoader>)
        });
        r.register_builder("EmNewsBuilder", |_| Box::new(EmNewsBuilder));

        r.register_loader("SwInduLoader", |ctx| {
            let s = ctx.settings;
            let loader = SwInduLoader::connect(
                &s.http_options(),
                s.endpoints.industry.clone(),
                s.fetch_context(ctx.date),
            )?;
            Ok(Box::new(loader) as Box<dyn DataLoader>)
        });
        r.register_builder("SwInduBuilder", |ctx| Box::new(SwInduBuilder::new(ctx.date)));

        r.register_loader("Cidx399317Loader", |ctx| {
            let s = ctx.settings;
            let loader = Cidx399317Loader::connect(
                &s.http_options(),
                &s.endpoints.index_composition,
                s.fetch_context(ctx.date),
            )?;
            Ok(Box::new(loader) as Box<dyn DataLoader>)
        });
        r.register_builder("Cidx399317Builder", |ctx| {
            Box::new(Cidx399317Builder::new(ctx.date))
        });

        r.register_loader("CnNewsLoader", |ctx| {
            let s = ctx.settings;
            let loader = CnNewsLoader::connect(
                &s.http_options(),
                &s.endpoints.picture_news,
                s.fetch_context(ctx.date),
            )?;
            Ok(Box::new(loader) as Box<dyn DataLoader>)
        });
        r.register_builder("CnNewsBuilder", |ctx| Box::new(CnNewsBuilder::new(ctx.date)));

        r.register_loader("WatchlistLoader", |ctx| {
            let s = ctx.settings;
            let spot = SpotEmLoader::connect(
                &s.http_options(),
                &s.endpoints.spot_quotes,
                s.fetch_context(ctx.date),
            )?;
            Ok(Box::new(WatchlistLoader::new(spot)) as Box<dyn DataLoader>)
        });
        r.register_builder("WatchlistBuilder", |ctx| {
            Box::new(WatchlistBuilder::new(ctx.settings.watchlist.codes.clone()))
        });

        r
    }
}
