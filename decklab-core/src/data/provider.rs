//! Provider trait, bounded retry policy and structured error types.
//!
//! The TableProvider trait abstracts over upstream sources (quote API, news
//! feed, spreadsheets, scraped pages) so loaders can be exercised against
//! in-memory fakes. The cache sits above this trait: providers don't know
//! about it.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::table::Table;

/// Structured error types for data acquisition and cleaning.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("response could not be decoded: {0}")]
    Decode(String),

    #[error("unexpected table layout: {0}")]
    Schema(String),

    #[error("{source_id}: giving up after {attempts} attempts")]
    RetriesExhausted {
        source_id: String,
        attempts: u32,
        #[source]
        last: Box<DataError>,
    },

    #[error("{source_id}: endpoint '{setting}' is not configured")]
    Unconfigured { source_id: String, setting: String },

    #[error("cache error: {0}")]
    Cache(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataframe error: {0}")]
    Frame(String),
}

impl DataError {
    /// Transport-level failures that a later attempt may not repeat.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::Network(_) | DataError::HttpStatus { .. } | DataError::Decode(_)
        )
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<polars::prelude::PolarsError> for DataError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        DataError::Frame(e.to_string())
    }
}

/// Upstream source of raw tables.
///
/// `resource` selects what to fetch. Single-table sources ignore it; sources
/// with sub-resources (industry lists, per-industry constituents) document
/// the identifiers they accept.
pub trait TableProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch_table(&self, resource: &str) -> Result<Table, DataError>;
}

/// Fixed attempt ceiling with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            pause: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, pause: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            pause,
        }
    }

    /// Policy that never sleeps; used by tests and offline fakes.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt ceiling is reached.
    pub fn run<T>(
        &self,
        source_id: &str,
        mut op: impl FnMut() -> Result<T, DataError>,
    ) -> Result<T, DataError> {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 && !self.pause.is_zero() {
                std::thread::sleep(self.pause);
            }
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() => {
                    warn!(source_id, attempt, attempts, error = %e, "fetch attempt failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(DataError::RetriesExhausted {
            source_id: source_id.to_string(),
            attempts,
            last: Box::new(
                last_error.unwrap_or_else(|| DataError::Network("no attempt made".into())),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn attempt(calls: &Cell<u32>, fail_first: u32, error: fn() -> DataError) -> Result<u32, DataError> {
        let n = calls.get();
        calls.set(n + 1);
        if n < fail_first {
            Err(error())
        } else {
            Ok(n)
        }
    }

    #[test]
    fn gives_up_after_exactly_max_attempts() {
        let calls = Cell::new(0);
        let err = RetryPolicy::immediate(3)
            .run("spot_em", || {
                attempt(&calls, u32::MAX, || DataError::Network("down".into()))
            })
            .unwrap_err();
        assert_eq!(calls.get(), 3);
        match err {
            DataError::RetriesExhausted {
                source_id,
                attempts,
                last,
            } => {
                assert_eq!(source_id, "spot_em");
                assert_eq!(attempts, 3);
                assert!(matches!(*last, DataError::Network(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn recovers_within_budget() {
        let calls = Cell::new(0);
        let res = RetryPolicy::immediate(3).run("spot_em", || {
            attempt(&calls, 2, || DataError::HttpStatus {
                url: "u".into(),
                status: 502,
            })
        });
        assert_eq!(res.unwrap(), 2);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let res = RetryPolicy::immediate(5).run("sw_indu", || {
            attempt(&calls, u32::MAX, || DataError::Unconfigured {
                source_id: "sw_indu".into(),
                setting: "sw_members".into(),
            })
        });
        assert!(matches!(res, Err(DataError::Unconfigured { .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        let _ = policy.run("x", || attempt(&calls, 0, || DataError::Network("x".into())));
        assert_eq!(calls.get(), 1);
    }
}
