//! End-to-end tests for the quote snapshot source: cached fetch, cleaning
//! and slide building against an in-memory provider.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use decklab_core::data::eastmoney::spot_header;
use decklab_core::data::{
    DataError, DataLoader, FetchContext, RetryPolicy, TableCache, TableProvider,
};
use decklab_core::deck::{Cell, DeckContent};
use decklab_core::quotes::col;
use decklab_core::sources::spot_em::{SpotEmBuilder, SpotEmLoader, SOURCE_ID};
use decklab_core::sources::watchlist::{WatchlistBuilder, WatchlistLoader};
use decklab_core::{Dataset, SlidesBuilder, Table};

// ── Fixtures ─────────────────────────────────────────────────────────

struct CountingProvider {
    table: Table,
    calls: Arc<AtomicUsize>,
}

impl TableProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    fn fetch_table(&self, _resource: &str) -> Result<Table, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.table.clone())
    }
}

struct FailingProvider {
    calls: Arc<AtomicUsize>,
}

impl TableProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn fetch_table(&self, _resource: &str) -> Result<Table, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DataError::HttpStatus {
            url: "http://quotes.invalid".into(),
            status: 503,
        })
    }
}

fn row(code: &str, name: &str, pe: f64, turnover: f64, mv: f64) -> Vec<String> {
    let mut r = vec!["1".to_string(); col::WIDTH];
    r[col::CODE] = code.into();
    r[col::NAME] = name.into();
    r[col::PE] = pe.to_string();
    r[col::PB] = "2".into();
    r[col::TURNOVER] = turnover.to_string();
    r[col::TOTAL_MARKET_VALUE] = mv.to_string();
    r
}

fn snapshot() -> Table {
    Table::with_rows(
        spot_header(),
        vec![
            row("000001", "平安银行", 5.0, 2e8, 10e8),
            row("600519", "贵州茅台", 25.0, 4e8, 20e8),
            row("300750", "宁德时代", -20.0, 6e8, 30e8),
        ],
    )
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

fn loader(dir: &std::path::Path, table: Table) -> (SpotEmLoader, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = CountingProvider {
        table,
        calls: Arc::clone(&calls),
    };
    let ctx = FetchContext::new(TableCache::new(dir), date(), RetryPolicy::immediate(3));
    (SpotEmLoader::new(Box::new(provider), ctx), calls)
}

// ── Cache ────────────────────────────────────────────────────────────

#[test]
fn second_fetch_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let (loader, calls) = loader(dir.path(), snapshot());

    let first = loader.fetch(SOURCE_ID).unwrap();
    let second = loader.fetch(SOURCE_ID).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
    assert!(dir.path().join("2026-10-17_spot_em.csv").exists());
}

#[test]
fn exhausted_retries_surface_and_nothing_is_cached() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = FailingProvider {
        calls: Arc::clone(&calls),
    };
    let ctx = FetchContext::new(TableCache::new(dir.path()), date(), RetryPolicy::immediate(3));
    let loader = SpotEmLoader::new(Box::new(provider), ctx);

    let err = loader.clean(SOURCE_ID).unwrap_err();
    assert!(matches!(err, DataError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!dir.path().join("2026-10-17_spot_em.csv").exists());
}

// ── Cleaning ─────────────────────────────────────────────────────────

#[test]
fn turnover_is_rescaled_and_summary_rounds_to_zero() {
    let dir = tempfile::tempdir().unwrap();
    let (loader, _) = loader(dir.path(), snapshot());

    let Dataset::Quotes(quotes) = loader.clean(SOURCE_ID).unwrap() else {
        panic!("expected quotes");
    };
    let turnover: Vec<f64> = quotes.iter().map(|q| q.turnover).collect();
    assert_eq!(turnover, vec![2.0, 4.0, 6.0]);
    let market_value: Vec<f64> = quotes.iter().map(|q| q.total_market_value).collect();
    assert_eq!(market_value, vec![10.0, 20.0, 30.0]);

    let set = SpotEmBuilder::new(date())
        .build(Dataset::Quotes(quotes))
        .unwrap();
    let summary = set
        .decks
        .iter()
        .find(|d| d.title.as_deref() == Some("市场概况"))
        .unwrap();
    let DeckContent::ScalarCards(cards) = &summary.content else {
        panic!("expected scalar cards");
    };
    assert_eq!(cards[0].1, Cell::Text("3只".into()));
    assert_eq!(cards[1], ("成交额".to_string(), Cell::Number(0.0)));
}

#[test]
fn ranks_and_tiers_are_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let (loader, _) = loader(dir.path(), snapshot());
    let Dataset::Quotes(quotes) = loader.clean(SOURCE_ID).unwrap() else {
        panic!("expected quotes");
    };
    let n = quotes.len() as f64;
    for q in quotes.iter() {
        assert!(q.market_cap_rank >= 1.0 && q.market_cap_rank <= n);
        let expected = ((n - q.market_cap_rank + 1.0) / n * 100.0 * 1000.0).round() / 1000.0;
        assert_eq!(q.market_cap_percentile, expected);
    }
    let top = quotes.iter().find(|q| q.code == "300750").unwrap();
    assert_eq!(top.market_cap_rank, 1.0);
    assert_eq!(top.market_cap_percentile, 100.0);

    // profit: 平安银行 2.0 > 贵州茅台 0.8 > 宁德时代 -1.5
    let by_code = |code: &str| quotes.iter().find(|q| q.code == code).unwrap();
    let (big, mid, small) = (by_code("000001"), by_code("600519"), by_code("300750"));
    assert_eq!(big.profit_rank, 1.0);
    assert!(big.profit_percentile > mid.profit_percentile);
    assert!(mid.profit_percentile > small.profit_percentile);
    assert_eq!(small.profit_percentile, 33.333);
}

// ── Building ─────────────────────────────────────────────────────────

#[test]
fn spot_deck_order_and_chart_options() {
    let dir = tempfile::tempdir().unwrap();
    let (loader, _) = loader(dir.path(), snapshot());
    let set = SpotEmBuilder::new(date())
        .with_top_n(2)
        .build(loader.clean(SOURCE_ID).unwrap())
        .unwrap();

    let titles: Vec<&str> = set.decks.iter().filter_map(|d| d.title.as_deref()).collect();
    assert_eq!(titles[0], "每日数据");
    assert_eq!(&titles[1..4], &["市场概况", "盈亏分布", "统计描述"]);
    assert_eq!(titles[4], "全部:成交额");
    assert_eq!(titles[7], "非银:成交额");
    assert_eq!(
        &titles[10..],
        &["净利润前10非银公司", "市值前10", "低PE前10", "涨幅前10"]
    );
    assert!(set.dangling_charts().is_empty());
    assert_eq!(set.chart_options.len(), 4);

    // financial names are filtered from the 非银 tables
    let DeckContent::Table(non_bank) = &set.decks[7].content else {
        panic!("expected table");
    };
    assert!(non_bank
        .rows
        .iter()
        .all(|r| r[0] != Cell::from("平安银行")));
    assert_eq!(non_bank.len(), 2);

    // negative PE is excluded from the low-PE chart
    let low_pe = &set.chart_options["低PE前10"]["yAxis"]["data"];
    assert_eq!(low_pe.as_array().unwrap().len(), 2);
}

#[test]
fn empty_snapshot_builds_zero_row_decks() {
    let dir = tempfile::tempdir().unwrap();
    let (loader, _) = loader(dir.path(), Table::new(spot_header()));
    let set = SpotEmBuilder::new(date())
        .build(loader.clean(SOURCE_ID).unwrap())
        .unwrap();
    let DeckContent::Table(t) = &set.decks[4].content else {
        panic!("expected table");
    };
    assert!(t.is_empty());
}

#[test]
fn watchlist_shares_the_snapshot_cache() {
    let dir = tempfile::tempdir().unwrap();
    let (spot, calls) = loader(dir.path(), snapshot());
    spot.fetch(SOURCE_ID).unwrap();

    let (inner, _) = loader(dir.path(), snapshot());
    let watch = WatchlistLoader::new(inner);
    let set = WatchlistBuilder::new(vec!["600519".into()])
        .build(watch.clean("watchlist").unwrap())
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(set.decks[0].title.as_deref(), Some("个股详情"));
    assert_eq!(set.decks[0].item_count(), 1);
}
