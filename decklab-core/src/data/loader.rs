//! Loader contract and the cached-fetch plumbing shared by every source.

use chrono::NaiveDate;
use tracing::error;

use super::cache::{CacheStatus, Granularity, TableCache};
use super::provider::{DataError, RetryPolicy, TableProvider};
use crate::dataset::Dataset;
use crate::table::Table;

/// Acquires and cleans one source.
///
/// `fetch` consults the period-keyed cache first and only calls upstream
/// on a miss; `clean` applies the source's transformation on top of `fetch`.
pub trait DataLoader {
    /// Type name used by the registry.
    fn name(&self) -> &'static str;

    fn fetch(&self, source_id: &str) -> Result<Table, DataError>;

    fn clean(&self, source_id: &str) -> Result<Dataset, DataError>;
}

/// Cache, report date and retry settings handed to every loader.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub cache: TableCache,
    pub date: NaiveDate,
    pub retry: RetryPolicy,
}

impl FetchContext {
    pub fn new(cache: TableCache, date: NaiveDate, retry: RetryPolicy) -> Self {
        Self { cache, date, retry }
    }

    pub fn period(&self, granularity: Granularity) -> String {
        granularity.period(self.date)
    }

    /// Whole-source fetch through the cache, retried on transient failure.
    pub fn cached(
        &self,
        source_id: &str,
        granularity: Granularity,
        provider: &dyn TableProvider,
        resource: &str,
    ) -> Result<Table, DataError> {
        let path = self.cache.entry_path(source_id, &self.period(granularity));
        self.fetch_at(source_id, &path, provider, resource)
    }

    /// Sub-resource fetch cached under `{source_id}/{period}_{key}.csv`.
    pub fn cached_sub(
        &self,
        source_id: &str,
        granularity: Granularity,
        provider: &dyn TableProvider,
        resource: &str,
    ) -> Result<(Table, CacheStatus), DataError> {
        let path = self
            .cache
            .sub_entry_path(source_id, &self.period(granularity), resource);
        self.cache
            .get_or_fetch(&path, || {
                self.retry
                    .run(source_id, || provider.fetch_table(resource))
            })
            .map_err(|e| log_failure(source_id, provider, e))
    }

    fn fetch_at(
        &self,
        source_id: &str,
        path: &std::path::Path,
        provider: &dyn TableProvider,
        resource: &str,
    ) -> Result<Table, DataError> {
        self.cache
            .get_or_fetch(path, || {
                self.retry
                    .run(source_id, || provider.fetch_table(resource))
            })
            .map(|(table, _)| table)
            .map_err(|e| log_failure(source_id, provider, e))
    }
}

fn log_failure(source_id: &str, provider: &dyn TableProvider, e: DataError) -> DataError {
    error!(source_id, provider = provider.name(), error = %e, "fetch failed");
    e
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory provider counting upstream calls.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct FakeProvider {
        pub tables: HashMap<String, Table>,
        pub calls: AtomicUsize,
    }

    impl FakeProvider {
        pub fn single(table: Table) -> Self {
            Self::with(vec![("", table)])
        }

        pub fn with(tables: Vec<(&str, Table)>) -> Self {
            Self {
                tables: tables
                    .into_iter()
                    .map(|(k, t)| (k.to_string(), t))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TableProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        fn fetch_table(&self, resource: &str) -> Result<Table, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tables
                .get(resource)
                .or_else(|| self.tables.get(""))
                .cloned()
                .ok_or_else(|| DataError::Network(format!("no fake table for '{resource}'")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeProvider;
    use super::*;

    #[test]
    fn cached_fetch_hits_upstream_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = FetchContext::new(
            TableCache::new(dir.path()),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            RetryPolicy::immediate(3),
        );
        let provider = FakeProvider::single(Table::new(vec!["a".into()]));
        ctx.cached("spot_em", Granularity::Daily, &provider, "").unwrap();
        ctx.cached("spot_em", Granularity::Daily, &provider, "").unwrap();
        assert_eq!(provider.calls(), 1);
        assert!(dir.path().join("2026-10-17_spot_em.csv").exists());
    }

    #[test]
    fn upstream_failure_propagates_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = FetchContext::new(
            TableCache::new(dir.path()),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            RetryPolicy::immediate(2),
        );
        let provider = FakeProvider::with(vec![]);
        let err = ctx
            .cached("spot_em", Granularity::Daily, &provider, "")
            .unwrap_err();
        assert!(matches!(err, DataError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn sub_fetches_are_cached_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = FetchContext::new(
            TableCache::new(dir.path()),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            RetryPolicy::immediate(1),
        );
        let provider = FakeProvider::single(Table::new(vec!["a".into()]));
        let (_, first) = ctx
            .cached_sub("sw_indu", Granularity::Daily, &provider, "members/1")
            .unwrap();
        let (_, second) = ctx
            .cached_sub("sw_indu", Granularity::Daily, &provider, "members/1")
            .unwrap();
        assert_eq!((first, second), (CacheStatus::Miss, CacheStatus::Hit));
        assert_eq!(provider.calls(), 1);
    }
}
