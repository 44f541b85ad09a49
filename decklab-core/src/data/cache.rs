//! Period-keyed CSV cache of raw provider results.
//!
//! Layout:
//! - `{cache_dir}/{period}_{source_id}.csv` for whole-source fetches
//! - `{cache_dir}/{source_id}/{period}_{key}.csv` for sub-fetches
//! - `{cache_dir}/{source_id}_history.csv` for accumulated history
//!
//! The period is the calendar date (`YYYY-MM-DD`) or month (`YYYY-MM`).
//! An entry is created on the first successful fetch for its period and is
//! read-only afterwards; nothing is ever invalidated automatically.
//! Writes are atomic (write to .tmp, rename into place).

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::provider::DataError;
use crate::table::Table;

/// How often a source's cache key rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    /// Cache period for a report date.
    pub fn period(self, date: NaiveDate) -> String {
        match self {
            Granularity::Daily => date.format("%Y-%m-%d").to_string(),
            Granularity::Monthly => date.format("%Y-%m").to_string(),
        }
    }
}

/// Whether a [`TableCache::get_or_fetch`] call was served locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// The CSV cache.
#[derive(Debug, Clone)]
pub struct TableCache {
    cache_dir: PathBuf,
}

impl TableCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// `{cache_dir}/{period}_{source_id}.csv`
    pub fn entry_path(&self, source_id: &str, period: &str) -> PathBuf {
        self.cache_dir.join(format!("{period}_{source_id}.csv"))
    }

    /// `{cache_dir}/{source_id}/{period}_{key}.csv`
    pub fn sub_entry_path(&self, source_id: &str, period: &str, key: &str) -> PathBuf {
        self.cache_dir
            .join(source_id)
            .join(format!("{period}_{}.csv", sanitize_key(key)))
    }

    /// `{cache_dir}/{source_id}_history.csv`
    pub fn history_path(&self, source_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{source_id}_history.csv"))
    }

    /// Read a cached table, `None` if the entry does not exist.
    pub fn read(&self, path: &Path) -> Result<Option<Table>, DataError> {
        if !path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(path).map_err(|e| DataError::io(path, e))?;
        Table::read_csv(file).map(Some)
    }

    /// Atomically write a table to `path`.
    pub fn write(&self, path: &Path, table: &Table) -> Result<(), DataError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
        }
        let tmp_path = path.with_extension("csv.tmp");
        {
            let file = fs::File::create(&tmp_path).map_err(|e| DataError::io(&tmp_path, e))?;
            table.write_csv(file)?;
        }
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Cache(format!("atomic rename failed for {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), rows = table.len(), "cache entry written");
        Ok(())
    }

    /// Return the cached table at `path`, or call `fetch`, persist the
    /// full result and return it.
    ///
    /// Cached rows are returned unchanged. A cache file that cannot be
    /// parsed is quarantined (`.quarantined`) and treated as a miss.
    /// Fetch failures are never substituted: they propagate to the caller.
    pub fn get_or_fetch(
        &self,
        path: &Path,
        fetch: impl FnOnce() -> Result<Table, DataError>,
    ) -> Result<(Table, CacheStatus), DataError> {
        match self.read(path) {
            Ok(Some(table)) => {
                info!(path = %path.display(), rows = table.len(), "cache hit");
                return Ok((table, CacheStatus::Hit));
            }
            Ok(None) => {}
            Err(e) => {
                let quarantine = path.with_extension("csv.quarantined");
                warn!(path = %path.display(), error = %e, "quarantining unreadable cache file");
                let _ = fs::rename(path, &quarantine);
            }
        }

        let table = fetch()?;
        self.write(path, &table)?;
        info!(path = %path.display(), rows = table.len(), "fetched and cached");
        Ok((table, CacheStatus::Miss))
    }

    /// Merge `incoming` into the history file for `source_id`, dropping
    /// exact duplicate rows, and return the merged history.
    pub fn merge_history(&self, source_id: &str, incoming: &Table) -> Result<Table, DataError> {
        let path = self.history_path(source_id);
        let mut history = self
            .read(&path)?
            .unwrap_or_else(|| Table::new(incoming.columns.clone()));
        let added = history.merge_distinct(incoming)?;
        self.write(&path, &history)?;
        info!(source_id, added, total = history.len(), "history merged");
        Ok(history)
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn sample() -> Table {
        Table::with_rows(
            vec!["code".into(), "value".into()],
            vec![vec!["1".into(), "2".into()]],
        )
    }

    #[test]
    fn period_keys() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(Granularity::Daily.period(d), "2026-10-17");
        assert_eq!(Granularity::Monthly.period(d), "2026-10");
    }

    #[test]
    fn entry_paths_follow_layout() {
        let cache = TableCache::new("cache");
        assert_eq!(
            cache.entry_path("spot_em", "2026-10-17"),
            PathBuf::from("cache/2026-10-17_spot_em.csv")
        );
        assert_eq!(
            cache.sub_entry_path("sw_indu", "2026-10-17", "members/850111"),
            PathBuf::from("cache/sw_indu/2026-10-17_members_850111.csv")
        );
        assert_eq!(
            cache.history_path("cidx399317"),
            PathBuf::from("cache/cidx399317_history.csv")
        );
    }

    #[test]
    fn second_call_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path());
        let path = cache.entry_path("spot_em", "2026-10-17");
        let calls = Cell::new(0);

        let (first, status) = cache
            .get_or_fetch(&path, || {
                calls.set(calls.get() + 1);
                Ok(sample())
            })
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);

        let (second, status) = cache
            .get_or_fetch(&path, || {
                calls.set(calls.get() + 1);
                Ok(sample())
            })
            .unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn fetch_failure_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path());
        let path = cache.entry_path("spot_em", "2026-10-17");
        let res = cache.get_or_fetch(&path, || Err(DataError::Network("down".into())));
        assert!(matches!(res, Err(DataError::Network(_))));
        assert!(!path.exists());
    }

    #[test]
    fn history_merge_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path());
        cache.merge_history("cidx399317", &sample()).unwrap();
        let merged = cache.merge_history("cidx399317", &sample()).unwrap();
        assert_eq!(merged.len(), 1);
        let on_disk = cache
            .read(&cache.history_path("cidx399317"))
            .unwrap()
            .unwrap();
        assert_eq!(on_disk, merged);
    }
}
