//! Shenwan (申万) industry classification: level-3 industry list, one
//! constituent fetch per industry, and the level-1 valuation table.
//!
//! Upstream resources (see [`JsonTableProvider`](crate::data::JsonTableProvider)):
//! `level1`, `level2`, `level3` info tables and `members/{industry code}`.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::data::{
    CacheStatus, DataError, DataLoader, FetchContext, Granularity, HttpOptions, JsonEndpoint,
    JsonTableProvider, TableProvider,
};
use crate::dataset::{Dataset, IndustryMember, IndustrySet, IndustrySummary};
use crate::deck::{Cell, Deck, TableData};
use crate::rollup::totals_by_category;
use crate::slides::charts;
use crate::slides::{unexpected, warn_if_empty, BuildError, SlideSet, SlidesBuilder};
use crate::stats::round_to;
use crate::table::Table;

pub const SOURCE_ID: &str = "sw_indu";

pub const LEVEL1: &str = "level1";
pub const LEVEL2: &str = "level2";
pub const LEVEL3: &str = "level3";
pub const MEMBERS: &str = "members";

/// Positional labels of the constituent table.
pub const MEMBER_COLUMNS: [&str; 17] = [
    "序号", "股票代码", "股票简称", "纳入时间", "行业", "行业2", "行业3", "价格", "pe", "pettm",
    "pb", "股息率", "市值", "净利同增", "上季利增", "营收同增", "上季营增",
];

mod member_col {
    pub const CODE: usize = 1;
    pub const NAME: usize = 2;
    pub const LEVEL3: usize = 6;
    pub const PRICE: usize = 7;
    pub const PE: usize = 8;
    pub const PE_TTM: usize = 9;
    pub const PB: usize = 10;
    pub const DIVIDEND_YIELD: usize = 11;
    pub const MARKET_VALUE: usize = 12;
}

const MEMBERS_LABEL: &str = "成份个数";
const PE_STATIC_LABEL: &str = "静态市盈率";
const PE_TTM_LABEL: &str = "TTM(滚动)市盈率";
const PB_LABEL: &str = "市净率";
const DIVIDEND_LABEL: &str = "静态股息率";
const PE_CHANGE_LABEL: &str = "PE变化";

pub struct SwInduLoader {
    provider: Box<dyn TableProvider>,
    ctx: FetchContext,
    pacing: Duration,
}

impl SwInduLoader {
    pub fn new(provider: Box<dyn TableProvider>, ctx: FetchContext, pacing: Duration) -> Self {
        Self {
            provider,
            ctx,
            pacing,
        }
    }

    /// Loader over configured JSON endpoints named `level1`, `level2`,
    /// `level3` and `members`.
    pub fn connect(
        options: &HttpOptions,
        endpoints: std::collections::BTreeMap<String, JsonEndpoint>,
        ctx: FetchContext,
    ) -> Result<Self, DataError> {
        let provider = JsonTableProvider::new(SOURCE_ID, options, endpoints)?;
        Ok(Self::new(Box::new(provider), ctx, options.pacing))
    }

    fn info_table(&self, source_id: &str, level: &str) -> Result<Table, DataError> {
        self.ctx
            .cached_sub(source_id, Granularity::Daily, self.provider.as_ref(), level)
            .map(|(t, _)| t)
    }

    fn fetch_members(&self, source_id: &str) -> Result<Table, DataError> {
        let level3 = self.info_table(source_id, LEVEL3)?;
        let code_idx = level3.require("行业代码")?;

        let mut all = Table::new(MEMBER_COLUMNS.iter().map(|c| c.to_string()).collect());
        for (i, row) in level3.rows.iter().enumerate() {
            let code = row.get(code_idx).map(String::as_str).unwrap_or("");
            if code.is_empty() {
                continue;
            }
            let resource = format!("{MEMBERS}/{code}");
            let (members, status) = self.ctx.cached_sub(
                source_id,
                Granularity::Daily,
                self.provider.as_ref(),
                &resource,
            )?;
            all.rows.extend(members.rows);
            if status == CacheStatus::Miss && i + 1 < level3.len() && !self.pacing.is_zero() {
                std::thread::sleep(self.pacing);
            }
        }
        info!(source_id, industries = level3.len(), rows = all.len(), "constituents fetched");
        Ok(all)
    }
}

fn parent_map(table: &Table) -> Result<HashMap<String, String>, DataError> {
    let name = table.require("行业名称")?;
    let parent = table.require("上级行业")?;
    Ok(table
        .rows
        .iter()
        .map(|r| {
            (
                r.get(name).cloned().unwrap_or_default(),
                r.get(parent).cloned().unwrap_or_default(),
            )
        })
        .collect())
}

fn num(raw: Option<&String>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn parse_level1(table: &Table) -> Result<Vec<IndustrySummary>, DataError> {
    let code = table.require("行业代码")?;
    let name = table.require("行业名称")?;
    let members = table.require(MEMBERS_LABEL)?;
    let pe_static = table.require(PE_STATIC_LABEL)?;
    let pe_ttm = table.require(PE_TTM_LABEL)?;
    let pb = table.require(PB_LABEL)?;
    let dividend = table.require(DIVIDEND_LABEL)?;
    Ok(table
        .rows
        .iter()
        .map(|r| IndustrySummary {
            code: r.get(code).cloned().unwrap_or_default(),
            name: r.get(name).cloned().unwrap_or_default(),
            members: num(r.get(members)),
            pe_static: num(r.get(pe_static)),
            pe_ttm: num(r.get(pe_ttm)),
            pb: num(r.get(pb)),
            dividend_yield: num(r.get(dividend)),
        })
        .collect())
}

/// Resolve each constituent's level-3 industry up to level 2 and level 1.
pub fn resolve_members(
    members: &Table,
    level2: &Table,
    level3: &Table,
) -> Result<Vec<IndustryMember>, DataError> {
    if members.width() < MEMBER_COLUMNS.len() {
        return Err(DataError::Schema(format!(
            "constituent table has {} columns, expected {}",
            members.width(),
            MEMBER_COLUMNS.len()
        )));
    }
    let up3 = parent_map(level3)?;
    let up2 = parent_map(level2)?;

    let mut unresolved = 0usize;
    let resolved = members
        .rows
        .iter()
        .map(|r| {
            let level3 = r.get(member_col::LEVEL3).cloned().unwrap_or_default();
            let level2 = up3.get(&level3).cloned().unwrap_or_default();
            let level1 = up2.get(&level2).cloned().unwrap_or_default();
            if level1.is_empty() {
                unresolved += 1;
            }
            IndustryMember {
                code: r.get(member_col::CODE).cloned().unwrap_or_default(),
                name: r.get(member_col::NAME).cloned().unwrap_or_default(),
                level1,
                level2,
                level3,
                price: num(r.get(member_col::PRICE)),
                pe: num(r.get(member_col::PE)),
                pe_ttm: num(r.get(member_col::PE_TTM)),
                pb: num(r.get(member_col::PB)),
                dividend_yield: num(r.get(member_col::DIVIDEND_YIELD)),
                market_value: num(r.get(member_col::MARKET_VALUE)),
            }
        })
        .collect();
    if unresolved > 0 {
        warn!(unresolved, "constituents without a resolvable level-1 industry");
    }
    Ok(resolved)
}

impl DataLoader for SwInduLoader {
    fn name(&self) -> &'static str {
        "SwInduLoader"
    }

    fn fetch(&self, source_id: &str) -> Result<Table, DataError> {
        let path = self
            .ctx
            .cache
            .entry_path(source_id, &self.ctx.period(Granularity::Daily));
        self.ctx
            .cache
            .get_or_fetch(&path, || self.fetch_members(source_id))
            .map(|(t, _)| t)
    }

    fn clean(&self, source_id: &str) -> Result<Dataset, DataError> {
        let members = self.fetch(source_id)?;
        let level1 = parse_level1(&self.info_table(source_id, LEVEL1)?)?;
        let level2 = self.info_table(source_id, LEVEL2)?;
        let level3 = self.info_table(source_id, LEVEL3)?;
        let members = resolve_members(&members, &level2, &level3)?;
        Ok(Dataset::Industry(IndustrySet { members, level1 }))
    }
}

pub struct SwInduBuilder {
    date: NaiveDate,
}

impl SwInduBuilder {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

/// Level-1 table sorted by one metric, largest first.
fn level1_table(level1: &[IndustrySummary], label: &str, metric: fn(&IndustrySummary) -> f64) -> Deck {
    let mut sorted: Vec<&IndustrySummary> = level1.iter().collect();
    sorted.sort_by(|a, b| {
        let (ka, kb) = (metric(a), metric(b));
        // NaN sorts last
        match (ka.is_nan(), kb.is_nan()) {
            (false, false) => kb.total_cmp(&ka),
            (a_nan, b_nan) => a_nan.cmp(&b_nan),
        }
    });

    let mut columns = vec!["行业名称".to_string(), MEMBERS_LABEL.to_string()];
    if label != MEMBERS_LABEL {
        columns.push(label.to_string());
    }
    let rows = sorted
        .into_iter()
        .map(|s| {
            let mut row = vec![Cell::from(s.name.as_str()), Cell::Number(s.members)];
            if label != MEMBERS_LABEL {
                row.push(Cell::Number(round_to(metric(s), 2)));
            }
            row
        })
        .collect();
    Deck::table(label, TableData::new(columns, rows))
}

impl SlidesBuilder for SwInduBuilder {
    fn name(&self) -> &'static str {
        "SwInduBuilder"
    }

    fn build(&self, data: Dataset) -> Result<SlideSet, BuildError> {
        warn_if_empty(self.name(), &data);
        let industry = match data {
            Dataset::Industry(i) => i,
            other => return Err(unexpected(self.name(), "industry", &other)),
        };

        let mut set = SlideSet::default();
        set.push(Deck::cover("申万每日行业", self.date.format("%Y-%m-%d").to_string()));

        let tables: [(&str, fn(&IndustrySummary) -> f64); 6] = [
            (MEMBERS_LABEL, |s| s.members),
            (PE_CHANGE_LABEL, |s| s.pe_static - s.pe_ttm),
            (DIVIDEND_LABEL, |s| s.dividend_yield),
            (PE_STATIC_LABEL, |s| s.pe_static),
            (PE_TTM_LABEL, |s| s.pe_ttm),
            (PB_LABEL, |s| s.pb),
        ];
        for (label, metric) in tables {
            set.push(level1_table(&industry.level1, label, metric));
        }

        let rows: Vec<(String, f64)> = industry
            .members
            .iter()
            .filter(|m| !m.level1.is_empty() && !m.market_value.is_nan())
            .map(|m| (m.level1.clone(), m.market_value))
            .collect();
        let totals = totals_by_category(&rows).map_err(|e| BuildError::Rollup {
            builder: self.name(),
            message: e.to_string(),
        })?;

        let labels: Vec<String> = totals.iter().map(|t| t.category.clone()).collect();
        let values: Vec<f64> = totals.iter().map(|t| round_to(t.total, 2)).collect();
        set.push_chart("一级行业成份股总市值", charts::hbar(&labels, &values));

        let mut by_count: Vec<(String, f64)> = totals
            .iter()
            .map(|t| (t.category.clone(), t.members))
            .collect();
        by_count.sort_by(|a, b| b.1.total_cmp(&a.1));
        let labels: Vec<String> = by_count.iter().map(|c| c.0.clone()).collect();
        let values: Vec<f64> = by_count.iter().map(|c| c.1).collect();
        set.push_chart("一级行业成份股数量", charts::hbar(&labels, &values));

        Ok(set)
    }
}
