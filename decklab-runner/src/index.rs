//! `index.html` linking the latest output of every pipeline.

use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use decklab_core::RenderError;

use crate::batch::modified_at;
use crate::html::HtmlRender;
use crate::registry::Registry;

pub const INDEX_NAME: &str = "index";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub name: String,
    pub file: String,
    pub updated: String,
}

/// Entries for every registered pipeline with an output on disk, most
/// recently written first.
pub fn index_entries(registry: &Registry, render: &HtmlRender) -> Vec<IndexEntry> {
    let mut found: Vec<_> = registry
        .pipelines()
        .iter()
        .filter_map(|spec| {
            let modified = modified_at(&render.output_path(&spec.name))?;
            Some((modified, spec.name.clone()))
        })
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    found
        .into_iter()
        .map(|(modified, name)| IndexEntry {
            file: format!("{name}.html"),
            name,
            updated: modified.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect()
}

/// Rewrite `{output_dir}/index.html`.
pub fn rebuild_index(registry: &Registry, render: &HtmlRender) -> Result<PathBuf, RenderError> {
    let entries = index_entries(registry, render);
    let html = render.render_template(INDEX_NAME, &json!({ "entries": entries }))?;
    let path = render.output_path(INDEX_NAME);
    render.write_atomic(&path, &html)?;
    info!(path = %path.display(), entries = entries.len(), "index rebuilt");
    Ok(path)
}
