//! Detail cards for a configured list of stock codes, drawn from the daily
//! quote snapshot.

use tracing::warn;

use crate::data::{DataError, DataLoader};
use crate::dataset::Dataset;
use crate::deck::{Cell, Deck, DeckContent, Record};
use crate::quotes::Quote;
use crate::slides::{unexpected, warn_if_empty, BuildError, SlideSet, SlidesBuilder};
use crate::sources::spot_em::{self, SpotEmLoader};
use crate::stats::round_to;
use crate::table::Table;

pub const SOURCE_ID: &str = "watchlist";

pub const DEFAULT_CODES: [&str; 7] = [
    "300750", "600674", "600941", "600309", "002415", "688234", "601398",
];

/// Reads the snapshot under the quote source's cache key so both pipelines
/// share one upstream fetch per day.
pub struct WatchlistLoader {
    inner: SpotEmLoader,
}

impl WatchlistLoader {
    pub fn new(inner: SpotEmLoader) -> Self {
        Self { inner }
    }
}

impl DataLoader for WatchlistLoader {
    fn name(&self) -> &'static str {
        "WatchlistLoader"
    }

    fn fetch(&self, _source_id: &str) -> Result<Table, DataError> {
        self.inner.fetch(spot_em::SOURCE_ID)
    }

    fn clean(&self, _source_id: &str) -> Result<Dataset, DataError> {
        self.inner.clean(spot_em::SOURCE_ID)
    }
}

/// Codes compare without leading zeros: `2415` matches `002415`.
fn same_code(a: &str, b: &str) -> bool {
    a.trim().trim_start_matches('0') == b.trim().trim_start_matches('0')
}

fn record(q: &Quote) -> Record {
    let n = |label: &str, v: f64| (label.to_string(), Cell::Number(round_to(v, 2)));
    vec![
        ("名称".to_string(), Cell::from(q.name.as_str())),
        n("涨跌幅", q.change_pct),
        ("代码".to_string(), Cell::from(q.code.as_str())),
        n("最新价", q.price),
        n("涨跌额", q.change_amount),
        n("成交额", q.turnover),
        n("总市值", q.total_market_value),
        n("市盈率", q.pe),
        n("市净率", q.pb),
        n("换手率", q.turnover_rate),
        n("振幅", q.amplitude),
        n("净利润", q.profit),
        n("净利排名", q.profit_rank),
        n("市值排名", q.market_cap_rank),
    ]
}

pub struct WatchlistBuilder {
    codes: Vec<String>,
}

impl WatchlistBuilder {
    pub fn new(codes: Vec<String>) -> Self {
        Self { codes }
    }
}

impl Default for WatchlistBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CODES.iter().map(|c| c.to_string()).collect())
    }
}

impl SlidesBuilder for WatchlistBuilder {
    fn name(&self) -> &'static str {
        "WatchlistBuilder"
    }

    fn build(&self, data: Dataset) -> Result<SlideSet, BuildError> {
        warn_if_empty(self.name(), &data);
        let quotes = match data {
            Dataset::Quotes(q) => q,
            other => return Err(unexpected(self.name(), "quotes", &other)),
        };

        let mut records = Vec::with_capacity(self.codes.len());
        for code in &self.codes {
            match quotes.iter().find(|q| same_code(&q.code, code)) {
                Some(q) => records.push(record(q)),
                None => warn!(code = %code, "watchlist code not in snapshot"),
            }
        }

        let mut set = SlideSet::default();
        set.push(Deck::titled("个股详情", DeckContent::Records(records)).with_rows_per_page(1));
        Ok(set)
    }
}
