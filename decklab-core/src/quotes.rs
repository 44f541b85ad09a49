//! Quote snapshot cleaning: missing-row removal, unit rescaling, derived
//! profit / net assets, and descending rank + percentile tiers.
//!
//! Raw snapshot fields are read by position; see [`col`].

use serde::Serialize;
use tracing::{info, warn};

use crate::data::DataError;
use crate::stats::{percentile_tiers, rank_descending};
use crate::table::Table;

/// Positional column indices of the raw quote snapshot.
pub mod col {
    pub const SEQ: usize = 0;
    pub const CODE: usize = 1;
    pub const NAME: usize = 2;
    pub const PRICE: usize = 3;
    pub const CHANGE_PCT: usize = 4;
    pub const CHANGE_AMOUNT: usize = 5;
    pub const VOLUME: usize = 6;
    pub const TURNOVER: usize = 7;
    pub const AMPLITUDE: usize = 8;
    pub const HIGH: usize = 9;
    pub const LOW: usize = 10;
    pub const OPEN: usize = 11;
    pub const PREV_CLOSE: usize = 12;
    pub const VOLUME_RATIO: usize = 13;
    pub const TURNOVER_RATE: usize = 14;
    pub const PE: usize = 15;
    pub const PB: usize = 16;
    pub const TOTAL_MARKET_VALUE: usize = 17;
    pub const FLOAT_MARKET_VALUE: usize = 18;
    pub const SPEED: usize = 19;
    pub const CHANGE_5M: usize = 20;
    pub const CHANGE_60D: usize = 21;
    pub const CHANGE_YTD: usize = 22;

    /// Minimum width of a snapshot table.
    pub const WIDTH: usize = 23;
}

/// Header labels expected at the positions cleaning depends on.
pub const EXPECTED_LABELS: [(usize, &str); 7] = [
    (col::NAME, "名称"),
    (col::CHANGE_PCT, "涨跌幅"),
    (col::TURNOVER, "成交额"),
    (col::PE, "市盈率-动态"),
    (col::PB, "市净率"),
    (col::TOTAL_MARKET_VALUE, "总市值"),
    (col::CHANGE_YTD, "年初至今涨跌幅"),
];

/// Turnover and market value are reported in yuan; decks show 亿 (1e8).
pub const UNIT_SCALE: f64 = 1e8;

/// One cleaned snapshot row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    /// Per-row counter, always 1 after cleaning.
    pub seq: f64,
    pub code: String,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
    pub change_amount: f64,
    pub volume: f64,
    pub turnover: f64,
    pub amplitude: f64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub prev_close: f64,
    pub volume_ratio: f64,
    pub turnover_rate: f64,
    pub pe: f64,
    pub pb: f64,
    pub total_market_value: f64,
    pub float_market_value: f64,
    pub speed: f64,
    pub change_5m: f64,
    pub change_60d: f64,
    pub change_ytd: f64,
    pub profit: f64,
    pub net_assets: f64,
    pub profit_rank: f64,
    pub profit_percentile: f64,
    pub market_cap_rank: f64,
    pub market_cap_percentile: f64,
}

/// Numeric fields addressable by builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    ChangePct,
    Turnover,
    Amplitude,
    TurnoverRate,
    Pe,
    Pb,
    TotalMarketValue,
    Speed,
    Change60d,
    ChangeYtd,
    Profit,
    NetAssets,
    ProfitPercentile,
    MarketCapPercentile,
}

impl Metric {
    /// Display label (cleaned header name).
    pub fn label(self) -> &'static str {
        match self {
            Metric::ChangePct => "涨跌幅",
            Metric::Turnover => "成交额",
            Metric::Amplitude => "振幅",
            Metric::TurnoverRate => "换手率",
            Metric::Pe => "市盈率",
            Metric::Pb => "市净率",
            Metric::TotalMarketValue => "总市值",
            Metric::Speed => "涨速",
            Metric::Change60d => "60日涨跌幅",
            Metric::ChangeYtd => "年初至今涨跌幅",
            Metric::Profit => "净利润",
            Metric::NetAssets => "净资产",
            Metric::ProfitPercentile => "p_tier",
            Metric::MarketCapPercentile => "mv_tier",
        }
    }
}

impl Quote {
    pub fn metric(&self, m: Metric) -> f64 {
        match m {
            Metric::ChangePct => self.change_pct,
            Metric::Turnover => self.turnover,
            Metric::Amplitude => self.amplitude,
            Metric::TurnoverRate => self.turnover_rate,
            Metric::Pe => self.pe,
            Metric::Pb => self.pb,
            Metric::TotalMarketValue => self.total_market_value,
            Metric::Speed => self.speed,
            Metric::Change60d => self.change_60d,
            Metric::ChangeYtd => self.change_ytd,
            Metric::Profit => self.profit,
            Metric::NetAssets => self.net_assets,
            Metric::ProfitPercentile => self.profit_percentile,
            Metric::MarketCapPercentile => self.market_cap_percentile,
        }
    }
}

/// Cleaned, ranked snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuoteSet {
    pub quotes: Vec<Quote>,
}

impl QuoteSet {
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Quote> {
        self.quotes.iter()
    }

    /// Subset keeping rows for which `keep` holds; ranks are not recomputed.
    pub fn filtered(&self, keep: impl Fn(&Quote) -> bool) -> QuoteSet {
        QuoteSet {
            quotes: self.quotes.iter().filter(|q| keep(q)).cloned().collect(),
        }
    }

    pub fn column(&self, m: Metric) -> Vec<f64> {
        self.quotes.iter().map(|q| q.metric(m)).collect()
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let v: f64 = raw.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

fn parse_text(raw: &str) -> Option<String> {
    let t = raw.trim();
    (!t.is_empty() && t != "-").then(|| t.to_string())
}

/// Warn about headers that do not carry the expected label at a position
/// cleaning relies on. Fields are still read by position.
pub fn check_headers(table: &Table) -> usize {
    let mut mismatches = 0;
    for (idx, expected) in EXPECTED_LABELS {
        match table.columns.get(idx) {
            Some(found) if found == expected => {}
            found => {
                mismatches += 1;
                warn!(
                    position = idx,
                    expected,
                    found = found.map(String::as_str).unwrap_or("<none>"),
                    "snapshot header differs from expected label"
                );
            }
        }
    }
    mismatches
}

fn parse_row(row: &[String]) -> Option<Quote> {
    let num = |i: usize| row.get(i).and_then(|c| parse_number(c));
    // The counter only needs to be present.
    num(col::SEQ)?;

    let total_market_value = num(col::TOTAL_MARKET_VALUE)? / UNIT_SCALE;
    let pe = num(col::PE)?;
    let pb = num(col::PB)?;
    let profit = total_market_value / pe;
    let net_assets = total_market_value / pb;
    if !profit.is_finite() || !net_assets.is_finite() {
        return None;
    }

    Some(Quote {
        seq: 1.0,
        code: row.get(col::CODE).and_then(|c| parse_text(c))?,
        name: row.get(col::NAME).and_then(|c| parse_text(c))?,
        price: num(col::PRICE)?,
        change_pct: num(col::CHANGE_PCT)?,
        change_amount: num(col::CHANGE_AMOUNT)?,
        volume: num(col::VOLUME)?,
        turnover: num(col::TURNOVER)? / UNIT_SCALE,
        amplitude: num(col::AMPLITUDE)?,
        high: num(col::HIGH)?,
        low: num(col::LOW)?,
        open: num(col::OPEN)?,
        prev_close: num(col::PREV_CLOSE)?,
        volume_ratio: num(col::VOLUME_RATIO)?,
        turnover_rate: num(col::TURNOVER_RATE)?,
        pe,
        pb,
        total_market_value,
        float_market_value: num(col::FLOAT_MARKET_VALUE)?,
        speed: num(col::SPEED)?,
        change_5m: num(col::CHANGE_5M)?,
        change_60d: num(col::CHANGE_60D)?,
        change_ytd: num(col::CHANGE_YTD)?,
        profit,
        net_assets,
        profit_rank: f64::NAN,
        profit_percentile: f64::NAN,
        market_cap_rank: f64::NAN,
        market_cap_percentile: f64::NAN,
    })
}

/// Clean and rank a raw quote snapshot.
///
/// Rows with any missing field are dropped, as are rows whose derived
/// profit or net assets is not a finite number. Turnover and total market
/// value are rescaled by [`UNIT_SCALE`].
pub fn clean_quotes(table: &Table) -> Result<QuoteSet, DataError> {
    if table.width() < col::WIDTH {
        return Err(DataError::Schema(format!(
            "quote snapshot has {} columns, expected at least {}",
            table.width(),
            col::WIDTH
        )));
    }
    check_headers(table);

    let mut quotes: Vec<Quote> = table.rows.iter().filter_map(|r| parse_row(r)).collect();
    let dropped = table.len() - quotes.len();

    let profit_ranks = rank_descending(&quotes.iter().map(|q| q.profit).collect::<Vec<_>>());
    let profit_tiers = percentile_tiers(&profit_ranks);
    let mv_ranks = rank_descending(
        &quotes
            .iter()
            .map(|q| q.total_market_value)
            .collect::<Vec<_>>(),
    );
    let mv_tiers = percentile_tiers(&mv_ranks);

    for (i, q) in quotes.iter_mut().enumerate() {
        q.profit_rank = profit_ranks[i];
        q.profit_percentile = profit_tiers[i];
        q.market_cap_rank = mv_ranks[i];
        q.market_cap_percentile = mv_tiers[i];
    }

    info!(kept = quotes.len(), dropped, "quote snapshot cleaned");
    Ok(QuoteSet { quotes })
}
