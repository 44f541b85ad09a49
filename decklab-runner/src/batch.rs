//! Batch refresh of every registered pipeline.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::html::HtmlRender;
use crate::pipeline::PipelineError;
use crate::registry::{BuildContext, Refresh, Registry};

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub rendered: Vec<(String, PathBuf)>,
    pub skipped: Vec<String>,
    pub errors: Vec<(String, PipelineError)>,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Modification time of `path`, if it exists.
pub fn modified_at(path: &Path) -> Option<DateTime<Local>> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Local>::from(modified))
}

/// Whether an output written at `modified` is still within its refresh
/// interval at `now`.
pub fn is_fresh(modified: DateTime<Local>, refresh: Refresh, now: DateTime<Local>) -> bool {
    now.signed_duration_since(modified) < refresh.interval()
}

/// Run every registered pipeline in registration order, writing each to
/// `{output_dir}/{name}.html`.
///
/// Pipelines whose output is younger than their refresh interval are
/// skipped unless `force` is set. A failing pipeline is recorded and the
/// batch continues.
pub fn run_all(
    registry: &Registry,
    ctx: &BuildContext,
    render: &HtmlRender,
    force: bool,
) -> BatchSummary {
    let mut summary = BatchSummary {
        total: registry.pipelines().len(),
        ..BatchSummary::default()
    };
    let now = Local::now();

    for spec in registry.pipelines() {
        let output = render.output_path(&spec.name);
        if !force {
            if let Some(modified) = modified_at(&output) {
                if is_fresh(modified, spec.refresh, now) {
                    info!(pipeline = %spec.name, refresh = spec.refresh.label(), "output is fresh, skipping");
                    summary.skipped.push(spec.name.clone());
                    continue;
                }
            }
        }

        let result = registry
            .resolve(&spec.name, ctx)
            .and_then(|pipeline| pipeline.run(render, &spec.name));
        match result {
            Ok(path) => summary.rendered.push((spec.name.clone(), path)),
            Err(e) => {
                warn!(pipeline = %spec.name, error = %e, "pipeline failed, continuing");
                summary.errors.push((spec.name.clone(), e));
            }
        }
    }

    info!(
        total = summary.total,
        rendered = summary.rendered.len(),
        skipped = summary.skipped.len(),
        failed = summary.errors.len(),
        "batch finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn freshness_window() {
        let now = Local::now();
        assert!(is_fresh(now - Duration::minutes(30), Refresh::Hourly, now));
        assert!(!is_fresh(now - Duration::minutes(90), Refresh::Hourly, now));
        assert!(is_fresh(now - Duration::hours(20), Refresh::Daily, now));
        assert!(is_fresh(now - Duration::days(20), Refresh::Monthly, now));
        assert!(!is_fresh(now - Duration::days(31), Refresh::Monthly, now));
    }

    #[test]
    fn missing_output_has_no_mtime() {
        let dir = tempfile::tempdir().unwrap();
        assert!(modified_at(&dir.path().join("nope.html")).is_none());
    }
}
