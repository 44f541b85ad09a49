//! Daily full-market quote snapshot.

use chrono::NaiveDate;

use crate::data::eastmoney::SpotQuoteProvider;
use crate::data::{DataError, DataLoader, FetchContext, Granularity, HttpOptions, TableProvider};
use crate::dataset::Dataset;
use crate::deck::Deck;
use crate::quotes::{clean_quotes, Metric, QuoteSet};
use crate::slides::common::{
    describe_card, pick_n, profit_loss_card, rank_table, summary_card, ExclusionFilter, Order,
};
use crate::slides::{charts, unexpected, warn_if_empty, BuildError, SlideSet, SlidesBuilder};
use crate::stats::round_to;
use crate::table::Table;

pub const SOURCE_ID: &str = "spot_em";

/// Default row count of the top-N tables.
pub const DEFAULT_TOP_N: usize = 16;
const CHART_N: usize = 10;

pub struct SpotEmLoader {
    provider: Box<dyn TableProvider>,
    ctx: FetchContext,
}

impl SpotEmLoader {
    pub fn new(provider: Box<dyn TableProvider>, ctx: FetchContext) -> Self {
        Self { provider, ctx }
    }

    pub fn connect(options: &HttpOptions, url: &str, ctx: FetchContext) -> Result<Self, DataError> {
        let provider = SpotQuoteProvider::new(options.clone(), url)?;
        Ok(Self::new(Box::new(provider), ctx))
    }
}

impl DataLoader for SpotEmLoader {
    fn name(&self) -> &'static str {
        "SpotEmLoader"
    }

    fn fetch(&self, source_id: &str) -> Result<Table, DataError> {
        self.ctx
            .cached(source_id, Granularity::Daily, self.provider.as_ref(), "")
    }

    fn clean(&self, source_id: &str) -> Result<Dataset, DataError> {
        let raw = self.fetch(source_id)?;
        Ok(Dataset::Quotes(clean_quotes(&raw)?))
    }
}

pub struct SpotEmBuilder {
    date: NaiveDate,
    top_n: usize,
    filter: ExclusionFilter,
}

impl SpotEmBuilder {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            top_n: DEFAULT_TOP_N,
            filter: ExclusionFilter::default(),
        }
    }

    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn with_filter(mut self, filter: ExclusionFilter) -> Self {
        self.filter = filter;
        self
    }
}

fn ranked_chart(
    set: &mut SlideSet,
    title: &str,
    quotes: &QuoteSet,
    metric: Metric,
    order: Order,
) {
    let picked = pick_n(&quotes.quotes, |q| q.metric(metric), CHART_N, order);
    let labels: Vec<String> = picked.iter().map(|q| q.name.clone()).collect();
    let values: Vec<f64> = picked.iter().map(|q| round_to(q.metric(metric), 2)).collect();
    set.push_chart(title, charts::hbar(&labels, &values));
}

impl SlidesBuilder for SpotEmBuilder {
    fn name(&self) -> &'static str {
        "SpotEmBuilder"
    }

    fn build(&self, data: Dataset) -> Result<SlideSet, BuildError> {
        warn_if_empty(self.name(), &data);
        let quotes = match data {
            Dataset::Quotes(q) => q,
            other => return Err(unexpected(self.name(), "quotes", &other)),
        };
        let non_financial = self.filter.apply(&quotes);

        let mut set = SlideSet::default();
        set.push(Deck::cover("每日数据", self.date.format("%Y-%m-%d").to_string()));
        set.push(summary_card(&quotes));
        set.push(profit_loss_card(&quotes));
        set.push(describe_card(&quotes));

        for (label, subset) in [("全部", &quotes), ("非银", &non_financial)] {
            for metric in [Metric::Turnover, Metric::TotalMarketValue, Metric::Profit] {
                set.push(rank_table(subset, label, metric, self.top_n, Order::Largest));
            }
        }

        ranked_chart(&mut set, "净利润前10非银公司", &non_financial, Metric::Profit, Order::Largest);
        ranked_chart(&mut set, "市值前10", &quotes, Metric::TotalMarketValue, Order::Largest);
        let positive_pe = quotes.filtered(|q| q.pe > 0.0);
        ranked_chart(&mut set, "低PE前10", &positive_pe, Metric::Pe, Order::Smallest);
        ranked_chart(&mut set, "涨幅前10", &quotes, Metric::ChangePct, Order::Largest);

        Ok(set)
    }
}
