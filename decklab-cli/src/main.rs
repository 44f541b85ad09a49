//! decklab CLI: build market slide decks as static HTML pages.
//!
//! Commands:
//! - one subcommand per built-in source (`spot-em`, `em-news`, ...)
//! - `run NAME`: any registered pipeline by name
//! - `all`: refresh every pipeline whose output is stale
//! - `index`: rewrite `index.html`
//! - `list`: registered pipelines and their last output

use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use decklab_runner::batch::modified_at;
use decklab_runner::logging;
use decklab_runner::registry::convention_names;
use decklab_runner::{rebuild_index, run_all, BuildContext, HtmlRender, Registry, Settings};

#[derive(Parser)]
#[command(name = "decklab", about = "decklab: market data slide decks")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file. Defaults to ./decklab.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report date (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    date: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// A-share quote snapshot: rankings, summary cards, charts.
    SpotEm,
    /// Exchange fast news, one slide per headline.
    EmNews,
    /// Shenwan industry valuation tables and charts.
    SwIndu,
    /// Index 399317 composition rollups by industry.
    #[command(name = "cidx399317")]
    Cidx399317,
    /// Picture news gallery.
    CnNews,
    /// Detail cards for the configured watchlist.
    Watchlist,
    /// Run a registered pipeline by name.
    Run {
        /// Pipeline name, e.g. sw_indu.
        name: String,
    },
    /// Run every registered pipeline, skipping fresh output.
    All {
        /// Re-run even when the output is within its refresh interval.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Rewrite the index page linking every rendered pipeline.
    Index,
    /// List registered pipelines.
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose).map_err(|e| anyhow!(e))?;

    let settings = Settings::load(cli.config.as_deref())?;
    let date = match cli.date.as_deref() {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| anyhow!("invalid --date '{s}': {e}"))?,
        None => Local::now().date_naive(),
    };
    let registry = Registry::with_defaults();
    let render = HtmlRender::new(&settings.output_dir)?;
    let ctx = BuildContext {
        settings: &settings,
        date,
    };

    match cli.command {
        Commands::SpotEm => run_one(&registry, &ctx, &render, "spot_em"),
        Commands::EmNews => run_one(&registry, &ctx, &render, "em_news"),
        Commands::SwIndu => run_one(&registry, &ctx, &render, "sw_indu"),
        Commands::Cidx399317 => run_one(&registry, &ctx, &render, "cidx399317"),
        Commands::CnNews => run_one(&registry, &ctx, &render, "cn_news"),
        Commands::Watchlist => run_one(&registry, &ctx, &render, "watchlist"),
        Commands::Run { name } => run_one(&registry, &ctx, &render, &name),
        Commands::All { force } => run_batch(&registry, &ctx, &render, force),
        Commands::Index => {
            let path = rebuild_index(&registry, &render)?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::List => {
            list(&registry, &render);
            Ok(())
        }
    }
}

fn run_one(registry: &Registry, ctx: &BuildContext, render: &HtmlRender, name: &str) -> Result<()> {
    let pipeline = registry.resolve(name, ctx)?;
    let path = pipeline.run(render, name)?;
    println!("{}", path.display());
    rebuild_index(registry, render)?;
    Ok(())
}

fn run_batch(registry: &Registry, ctx: &BuildContext, render: &HtmlRender, force: bool) -> Result<()> {
    let summary = run_all(registry, ctx, render, force);
    let index = rebuild_index(registry, render)?;

    for (name, path) in &summary.rendered {
        println!("{name:<12} {}", path.display());
    }
    for name in &summary.skipped {
        println!("{name:<12} fresh, skipped");
    }
    info!(index = %index.display(), "index written");

    if !summary.all_succeeded() {
        for (name, err) in &summary.errors {
            let cause = std::error::Error::source(err)
                .map(|s| format!(": {s}"))
                .unwrap_or_default();
            eprintln!("Error for {name}: {err}{cause}");
        }
        bail!(
            "{} of {} pipelines failed",
            summary.errors.len(),
            summary.total
        );
    }
    Ok(())
}

fn list(registry: &Registry, render: &HtmlRender) {
    println!(
        "{:<12} {:<8} {:<20} {:<20} LAST OUTPUT",
        "NAME", "REFRESH", "LOADER", "BUILDER"
    );
    for spec in registry.pipelines() {
        let (loader, builder) = convention_names(&spec.name);
        let updated = modified_at(&render.output_path(&spec.name))
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:<8} {:<20} {:<20} {}",
            spec.name,
            spec.refresh.label(),
            loader,
            builder,
            updated
        );
    }
}
