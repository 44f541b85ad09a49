//! Runtime settings: `decklab.toml` plus environment overrides.
//!
//! Every field has a default, so a missing file (or an empty one) is a
//! valid configuration. Industry endpoints have no public default and must
//! be configured before the `sw_indu` pipeline can fetch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use decklab_core::data::{
    chinanews, cnindex, eastmoney, FetchContext, HttpOptions, JsonEndpoint, RetryPolicy,
    TableCache,
};
use decklab_core::slides::common::FINANCIAL_TERMS;
use decklab_core::sources::spot_em::DEFAULT_TOP_N;
use decklab_core::sources::watchlist::DEFAULT_CODES;

pub const DEFAULT_CONFIG_FILE: &str = "decklab.toml";

pub const ENV_CACHE_DIR: &str = "DECKLAB_CACHE_DIR";
pub const ENV_OUTPUT_DIR: &str = "DECKLAB_OUTPUT_DIR";
pub const ENV_TIMEOUT_SECS: &str = "DECKLAB_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Upstream URLs per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub spot_quotes: String,
    pub fast_news: String,
    pub index_composition: String,
    pub picture_news: String,
    /// Named JSON endpoints for the industry source: `level1`, `level2`,
    /// `level3` and `members` (with a `{key}` placeholder).
    pub industry: BTreeMap<String, JsonEndpoint>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            spot_quotes: eastmoney::SPOT_URL.to_string(),
            fast_news: eastmoney::NEWS_URL.to_string(),
            index_composition: cnindex::COMPOSITION_URL.to_string(),
            picture_news: chinanews::PICTURE_PAGE_URL.to_string(),
            industry: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchlistSettings {
    pub codes: Vec<String>,
}

impl Default for WatchlistSettings {
    fn default() -> Self {
        Self {
            codes: DEFAULT_CODES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_pause_ms: u64,
    pub pacing_ms: u64,
    /// Rows in the top-N tables of the quote snapshot deck.
    pub top_n: usize,
    /// Name fragments excluded from the non-financial tables.
    pub exclude_terms: Vec<String>,
    pub endpoints: Endpoints,
    pub watchlist: WatchlistSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            output_dir: PathBuf::from("reveal"),
            request_timeout_secs: 30,
            retry_attempts: 3,
            retry_pause_ms: 500,
            pacing_ms: 500,
            top_n: DEFAULT_TOP_N,
            exclude_terms: FINANCIAL_TERMS.iter().map(|t| t.to_string()).collect(),
            endpoints: Endpoints::default(),
            watchlist: WatchlistSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a TOML string. Does not apply env overrides.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`, or from `decklab.toml` in the working
    /// directory when present, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Apply `DECKLAB_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(dir) = lookup(ENV_CACHE_DIR).filter(|v| !v.is_empty()) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.is_empty()) {
            self.request_timeout_secs = secs.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_TIMEOUT_SECS} must be a whole number, got '{secs}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid("retry_attempts must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".into()));
        }
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be positive".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_pause_ms))
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.request_timeout_secs),
            pacing: Duration::from_millis(self.pacing_ms),
            ..HttpOptions::default()
        }
    }

    pub fn fetch_context(&self, date: NaiveDate) -> FetchContext {
        FetchContext::new(TableCache::new(&self.cache_dir), date, self.retry_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let s = Settings::from_toml("").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.output_dir, PathBuf::from("reveal"));
        assert_eq!(s.watchlist.codes.len(), 7);
        assert!(s.endpoints.industry.is_empty());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let s = Settings::from_toml(
            r#"
            cache_dir = "/var/cache/decklab"
            retry_attempts = 5
            top_n = 20

            [watchlist]
            codes = ["600519"]

            [endpoints.industry.level1]
            url = "https://example.invalid/level1"
            records_path = "data"
            fields = ["code", "name"]
            columns = ["行业代码", "行业名称"]
            "#,
        )
        .unwrap();
        assert_eq!(s.cache_dir, PathBuf::from("/var/cache/decklab"));
        assert_eq!(s.retry_policy().max_attempts, 5);
        assert_eq!(s.top_n, 20);
        assert_eq!(s.watchlist.codes, vec!["600519"]);
        assert_eq!(s.endpoints.industry["level1"].records_path, "data");
        assert_eq!(s.endpoints.spot_quotes, eastmoney::SPOT_URL);

        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let ctx = s.fetch_context(date);
        assert_eq!(ctx.retry.max_attempts, 5);
        assert_eq!(ctx.cache.cache_dir(), Path::new("/var/cache/decklab"));
    }

    #[test]
    fn env_overrides_win() {
        let mut s = Settings::default();
        s.apply_env(|k| match k {
            ENV_CACHE_DIR => Some("/tmp/c".into()),
            ENV_TIMEOUT_SECS => Some("7".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(s.cache_dir, PathBuf::from("/tmp/c"));
        assert_eq!(s.output_dir, PathBuf::from("reveal"));
        assert_eq!(s.http_options().timeout, Duration::from_secs(7));
    }

    #[test]
    fn bad_timeout_override_is_invalid() {
        let mut s = Settings::default();
        let err = s
            .apply_env(|k| (k == ENV_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_retries_or_timeout_rejected() {
        assert!(matches!(
            Settings::from_toml("retry_attempts = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_toml("request_timeout_secs = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            Settings::from_toml("retry_attempts = \"three\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
