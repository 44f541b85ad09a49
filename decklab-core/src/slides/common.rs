//! Sub-algorithms shared by the quote-based builders: top/bottom-N tables,
//! summary and distribution cards, descriptive statistics and the name
//! exclusion filter.

use tracing::warn;

use crate::deck::{Cell, Deck, DeckContent, TableData};
use crate::quotes::{Metric, Quote, QuoteSet};
use crate::stats::{round_to, Describe};

/// Name fragments that mark financial-sector companies.
pub const FINANCIAL_TERMS: [&str; 5] = ["银行", "证券", "保险", "中国", "商行"];

/// Columns shown by top/bottom-N tables.
pub const RANK_TABLE_METRICS: [Metric; 4] = [
    Metric::ChangePct,
    Metric::Pe,
    Metric::ProfitPercentile,
    Metric::MarketCapPercentile,
];

/// Columns summarised by the descriptive statistics card.
pub const DESCRIBE_METRICS: [Metric; 8] = [
    Metric::ChangePct,
    Metric::Amplitude,
    Metric::TurnoverRate,
    Metric::Pe,
    Metric::Pb,
    Metric::Speed,
    Metric::Change60d,
    Metric::ChangeYtd,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Largest,
    Smallest,
}

/// Up to `n` items with the largest (or smallest) key.
///
/// Ties keep input order; items whose key is NaN are never picked.
pub fn pick_n<T>(items: &[T], key: impl Fn(&T) -> f64, n: usize, order: Order) -> Vec<&T> {
    let mut idx: Vec<usize> = (0..items.len()).filter(|&i| !key(&items[i]).is_nan()).collect();
    idx.sort_by(|&a, &b| {
        let (ka, kb) = (key(&items[a]), key(&items[b]));
        match order {
            Order::Largest => kb.total_cmp(&ka),
            Order::Smallest => ka.total_cmp(&kb),
        }
    });
    idx.into_iter().take(n).map(|i| &items[i]).collect()
}

/// Top/bottom-N table titled `"{label}:{metric}"`.
pub fn rank_table(quotes: &QuoteSet, label: &str, metric: Metric, n: usize, order: Order) -> Deck {
    let title = format!("{label}:{}", metric.label());
    let picked = pick_n(&quotes.quotes, |q| q.metric(metric), n, order);
    if picked.is_empty() {
        warn!(title, "rank table is empty");
    }

    let mut columns = vec!["名称".to_string()];
    columns.extend(RANK_TABLE_METRICS.iter().map(|m| m.label().to_string()));
    let rows = picked
        .into_iter()
        .map(|q| {
            let mut row = vec![Cell::from(q.name.as_str())];
            row.extend(RANK_TABLE_METRICS.iter().map(|m| Cell::Number(q.metric(*m))));
            row
        })
        .collect();
    Deck::table(title, TableData::new(columns, rows))
}

/// Market-wide totals card: counts, turnover, market value, profit (in
/// 万亿, i.e. 亿 / 10,000) and the aggregate PE.
pub fn summary_card(quotes: &QuoteSet) -> Deck {
    // fold from +0.0: an empty f64 sum is -0.0
    let count = quotes.iter().fold(0.0, |acc, q| acc + q.seq);
    let sum = |m: Metric| quotes.iter().fold(0.0, |acc, q| acc + q.metric(m));
    let turnover = round_to(sum(Metric::Turnover) / 10_000.0, 2);
    let market_value = round_to(sum(Metric::TotalMarketValue) / 10_000.0, 2);
    let profit = round_to(sum(Metric::Profit) / 10_000.0, 2);
    let market_pe = if profit == 0.0 {
        0.0
    } else {
        round_to(market_value / profit, 2)
    };

    if quotes.is_empty() {
        warn!("summary card built from an empty snapshot");
    }

    let cards = vec![
        ("股票数量".to_string(), Cell::Text(format!("{}只", count.round() as u64))),
        (Metric::Turnover.label().to_string(), Cell::Number(turnover)),
        (Metric::TotalMarketValue.label().to_string(), Cell::Number(market_value)),
        (Metric::Profit.label().to_string(), Cell::Number(profit)),
        ("市场PE".to_string(), Cell::Number(market_pe)),
    ];
    Deck::titled("市场概况", DeckContent::ScalarCards(cards)).with_rows_per_page(5)
}

/// Share of loss-making (negative PE) and profitable companies, in percent.
pub fn profit_loss_split(quotes: &QuoteSet) -> (f64, f64) {
    if quotes.is_empty() {
        return (0.0, 0.0);
    }
    let losing = quotes.iter().filter(|q| q.pe < 0.0).count();
    let lose = round_to(losing as f64 / quotes.len() as f64 * 100.0, 2);
    let gain = round_to(100.0 - lose, 2);
    (gain, lose)
}

pub fn profit_loss_card(quotes: &QuoteSet) -> Deck {
    let (gain, lose) = profit_loss_split(quotes);
    let cards = vec![
        ("盈利".to_string(), Cell::Number(gain)),
        ("亏损".to_string(), Cell::Number(lose)),
    ];
    Deck::titled("盈亏分布", DeckContent::ScalarCards(cards))
}

/// mean/std/min/quartiles/max of the [`DESCRIBE_METRICS`] columns.
pub fn describe_card(quotes: &QuoteSet) -> Deck {
    let stats: Vec<Describe> = DESCRIBE_METRICS
        .iter()
        .map(|m| Describe::of(&quotes.column(*m)))
        .collect();

    let mut columns = vec![String::new()];
    columns.extend(DESCRIBE_METRICS.iter().map(|m| m.label().to_string()));
    let rows = Describe::LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let mut row = vec![Cell::from(*label)];
            row.extend(stats.iter().map(|s| Cell::Number(round_to(s.values()[i], 2))));
            row
        })
        .collect();
    Deck::titled("统计描述", DeckContent::StatsCard(TableData::new(columns, rows)))
        .with_rows_per_page(8)
}

/// Drops rows whose name contains any denylisted fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionFilter {
    terms: Vec<String>,
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::new(FINANCIAL_TERMS.iter().map(|t| t.to_string()).collect())
    }
}

impl ExclusionFilter {
    pub fn new(terms: Vec<String>) -> Self {
        Self {
            terms: terms.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }

    pub fn excludes(&self, name: &str) -> bool {
        self.terms.iter().any(|t| name.contains(t.as_str()))
    }

    pub fn apply(&self, quotes: &QuoteSet) -> QuoteSet {
        quotes.filtered(|q: &Quote| !self.excludes(&q.name))
    }
}

/// Remove `【…】` tags from a news excerpt.
pub fn strip_bracket_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('【') {
        match rest[open..].find('】') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + '】'.len_utf8()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}
