//! Data acquisition: providers, the period-keyed cache and the loader
//! contract.

pub mod cache;
pub mod chinanews;
pub mod cnindex;
pub mod eastmoney;
pub mod http;
pub mod json_table;
pub mod loader;
pub mod provider;

pub use cache::{CacheStatus, Granularity, TableCache};
pub use http::{HttpClient, HttpOptions};
pub use json_table::{JsonEndpoint, JsonTableProvider};
pub use loader::{DataLoader, FetchContext};
pub use provider::{DataError, RetryPolicy, TableProvider};
