//! Cleaned loader outputs consumed by slide builders.

use serde::Serialize;

use crate::quotes::QuoteSet;

/// Output of [`DataLoader::clean`](crate::data::DataLoader::clean).
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Quotes(QuoteSet),
    Composition(CompositionSet),
    Industry(IndustrySet),
    News(Vec<NewsItem>),
    Images(Vec<ImageItem>),
}

impl Dataset {
    pub fn kind(&self) -> &'static str {
        match self {
            Dataset::Quotes(_) => "quotes",
            Dataset::Composition(_) => "composition",
            Dataset::Industry(_) => "industry",
            Dataset::News(_) => "news",
            Dataset::Images(_) => "images",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dataset::Quotes(q) => q.len(),
            Dataset::Composition(c) => c.latest.len(),
            Dataset::Industry(i) => i.members.len(),
            Dataset::News(n) => n.len(),
            Dataset::Images(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Date × category matrix. `values[d][c]` is NaN where the category has no
/// rows on date `d`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pivot {
    pub dates: Vec<String>,
    pub categories: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Pivot {
    pub fn get(&self, date_idx: usize, cat_idx: usize) -> f64 {
        self.values
            .get(date_idx)
            .and_then(|row| row.get(cat_idx))
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Time series of one category across all dates.
    pub fn series(&self, cat_idx: usize) -> Vec<f64> {
        (0..self.dates.len())
            .map(|d| self.get(d, cat_idx))
            .collect()
    }

    /// Index of the last (most recent) date, if any.
    pub fn latest(&self) -> Option<usize> {
        self.dates.len().checked_sub(1)
    }
}

/// One index constituent on one sample date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constituent {
    pub date: String,
    pub code: String,
    pub name: String,
    pub industry: String,
    pub market_value: f64,
    pub weight: f64,
}

/// Index composition: the current month's sample plus the accumulated
/// history rolled up by industry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositionSet {
    /// Cache period (`YYYY-MM`) of the current sample.
    pub month: String,
    /// Constituents on the most recent sample date.
    pub latest: Vec<Constituent>,
    /// Market value summed by date × industry over the history.
    pub value_by_industry: Pivot,
    /// Constituent count by date × industry over the history.
    pub members_by_industry: Pivot,
}

/// One industry-index constituent with its resolved industry levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndustryMember {
    pub code: String,
    pub name: String,
    pub level1: String,
    pub level2: String,
    pub level3: String,
    pub price: f64,
    pub pe: f64,
    pub pe_ttm: f64,
    pub pb: f64,
    pub dividend_yield: f64,
    pub market_value: f64,
}

/// First-level industry valuation summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndustrySummary {
    pub code: String,
    pub name: String,
    pub members: f64,
    pub pe_static: f64,
    pub pe_ttm: f64,
    pub pb: f64,
    pub dividend_yield: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndustrySet {
    pub members: Vec<IndustryMember>,
    pub level1: Vec<IndustrySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsItem {
    pub headline: String,
    pub excerpt: String,
    pub published: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageItem {
    pub src: String,
    pub caption: String,
}
