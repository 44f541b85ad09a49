//! 国证全指 (399317) composition: monthly sample workbook merged into an
//! accumulated history, rolled up by industry.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

use crate::data::cnindex::CompositionProvider;
use crate::data::{DataError, DataLoader, FetchContext, Granularity, HttpOptions, TableProvider};
use crate::dataset::{CompositionSet, Constituent, Dataset, Pivot};
use crate::deck::Deck;
use crate::rollup::pivot_sum_count;
use crate::slides::charts::{self, SeriesKind};
use crate::slides::common::{pick_n, Order};
use crate::slides::{unexpected, warn_if_empty, BuildError, SlideSet, SlidesBuilder};
use crate::stats::round_to;
use crate::table::Table;

pub const SOURCE_ID: &str = "cidx399317";

/// Positional header of the sample workbook.
pub const COMPOSITION_COLUMNS: [&str; 6] = ["日期", "代码", "简称", "行业", "市值", "权重"];

const TOP_PER_INDUSTRY: usize = 10;

pub struct Cidx399317Loader {
    provider: Box<dyn TableProvider>,
    ctx: FetchContext,
}

impl Cidx399317Loader {
    pub fn new(provider: Box<dyn TableProvider>, ctx: FetchContext) -> Self {
        Self { provider, ctx }
    }

    pub fn connect(options: &HttpOptions, url: &str, ctx: FetchContext) -> Result<Self, DataError> {
        let provider = CompositionProvider::new(options, url)?;
        Ok(Self::new(Box::new(provider), ctx))
    }
}

/// Relabel the first six columns positionally and drop any extras.
pub fn normalize_composition(raw: &Table) -> Result<Table, DataError> {
    if raw.width() < COMPOSITION_COLUMNS.len() {
        return Err(DataError::Schema(format!(
            "composition sheet has {} columns, expected {}",
            raw.width(),
            COMPOSITION_COLUMNS.len()
        )));
    }
    let rows = raw
        .rows
        .iter()
        .map(|r| {
            (0..COMPOSITION_COLUMNS.len())
                .map(|i| {
                    let cell = r.get(i).map(|c| c.trim()).unwrap_or("");
                    // sample dates sometimes carry a time part
                    if i == 0 {
                        cell.chars().take(10).collect()
                    } else {
                        cell.to_string()
                    }
                })
                .collect()
        })
        .collect();
    Ok(Table::with_rows(
        COMPOSITION_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    ))
}

/// Parse normalized rows; rows with a missing field are dropped.
pub fn parse_constituents(table: &Table) -> Vec<Constituent> {
    let text = |r: &[String], i: usize| -> Option<String> {
        let v = r.get(i)?.trim();
        (!v.is_empty()).then(|| v.to_string())
    };
    let num = |r: &[String], i: usize| -> Option<f64> {
        r.get(i)?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    };
    table
        .rows
        .iter()
        .filter_map(|r| {
            let r = r.as_slice();
            Some(Constituent {
                date: text(r, 0)?,
                code: text(r, 1)?,
                name: text(r, 2)?,
                industry: text(r, 3)?,
                market_value: num(r, 4)?,
                weight: num(r, 5)?,
            })
        })
        .collect()
}

impl DataLoader for Cidx399317Loader {
    fn name(&self) -> &'static str {
        "Cidx399317Loader"
    }

    fn fetch(&self, source_id: &str) -> Result<Table, DataError> {
        self.ctx
            .cached(source_id, Granularity::Monthly, self.provider.as_ref(), "")
    }

    fn clean(&self, source_id: &str) -> Result<Dataset, DataError> {
        let month = normalize_composition(&self.fetch(source_id)?)?;
        let history = self.ctx.cache.merge_history(source_id, &month)?;

        let month_rows = parse_constituents(&month);
        let latest_date = month_rows.iter().map(|c| c.date.clone()).max();
        let latest: Vec<Constituent> = month_rows
            .into_iter()
            .filter(|c| Some(&c.date) == latest_date.as_ref())
            .collect();

        let long: Vec<(String, String, f64)> = parse_constituents(&history)
            .into_iter()
            .map(|c| (c.date, c.industry, c.market_value))
            .collect();
        let (value_by_industry, members_by_industry) = pivot_sum_count(&long)?;
        info!(
            source_id,
            latest = latest.len(),
            history_dates = value_by_industry.dates.len(),
            "composition cleaned"
        );

        Ok(Dataset::Composition(CompositionSet {
            month: self.ctx.period(Granularity::Monthly),
            latest,
            value_by_industry,
            members_by_industry,
        }))
    }
}

pub struct Cidx399317Builder {
    date: NaiveDate,
}

impl Cidx399317Builder {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

/// `(category, value)` on the pivot's most recent date; empty cells skipped.
fn latest_slice(pivot: &Pivot) -> Vec<(String, f64)> {
    let Some(d) = pivot.latest() else {
        return Vec::new();
    };
    pivot
        .categories
        .iter()
        .enumerate()
        .map(|(c, category)| (category.clone(), pivot.get(d, c)))
        .filter(|(_, v)| !v.is_nan())
        .collect()
}

fn sort_desc(pairs: &mut [(String, f64)]) {
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
}

fn hbar_of(pairs: &[(String, f64)]) -> serde_json::Value {
    let labels: Vec<String> = pairs.iter().map(|p| p.0.clone()).collect();
    let values: Vec<f64> = pairs.iter().map(|p| round_to(p.1, 2)).collect();
    charts::hbar(&labels, &values)
}

impl SlidesBuilder for Cidx399317Builder {
    fn name(&self) -> &'static str {
        "Cidx399317Builder"
    }

    fn build(&self, data: Dataset) -> Result<SlideSet, BuildError> {
        warn_if_empty(self.name(), &data);
        let comp = match data {
            Dataset::Composition(c) => c,
            other => return Err(unexpected(self.name(), "composition", &other)),
        };

        let mut set = SlideSet::default();
        set.push(Deck::cover("国证全指399317", self.date.format("%Y-%m").to_string()));

        let history = &comp.value_by_industry;
        for (ci, industry) in history.categories.iter().enumerate() {
            let series: Vec<f64> = history.series(ci).into_iter().map(|v| round_to(v, 2)).collect();
            set.push_chart(
                format!("{industry}行业市值变化"),
                charts::series(SeriesKind::Line, &history.dates, &series),
            );
        }

        let latest_date = history
            .latest()
            .map(|d| history.dates[d].clone())
            .unwrap_or_else(|| comp.month.clone());

        let mut by_count = latest_slice(&comp.members_by_industry);
        let counts: BTreeMap<String, f64> = by_count.iter().cloned().collect();
        sort_desc(&mut by_count);
        set.push_chart("各行业上市股票总数", hbar_of(&by_count));

        let mut by_total = latest_slice(history);
        sort_desc(&mut by_total);
        set.push_chart(format!("{latest_date}行业规模"), hbar_of(&by_total));

        let mut by_average: Vec<(String, f64)> = by_total
            .iter()
            .map(|(category, total)| {
                let members = counts.get(category).copied().unwrap_or(0.0);
                let avg = if members > 0.0 { total / members } else { 0.0 };
                (category.clone(), avg)
            })
            .collect();
        sort_desc(&mut by_average);
        set.push_chart(format!("{latest_date}平均规模"), hbar_of(&by_average));

        let mut by_industry: BTreeMap<&str, Vec<&Constituent>> = BTreeMap::new();
        for c in &comp.latest {
            by_industry.entry(c.industry.as_str()).or_default().push(c);
        }
        for (industry, members) in by_industry.into_iter().rev() {
            let top = pick_n(&members, |c| c.market_value, TOP_PER_INDUSTRY, Order::Largest);
            let pairs: Vec<(String, f64)> = top
                .into_iter()
                .map(|c| (c.name.clone(), c.market_value))
                .collect();
            set.push_chart(format!("{industry}前{TOP_PER_INDUSTRY}大"), hbar_of(&pairs));
        }

        Ok(set)
    }
}
