//! Property tests for the shared slide algorithms.
//!
//! Uses proptest to verify:
//! 1. Top-N returns exactly min(N, rows) rows, sorted, without duplicates
//! 2. The exclusion filter removes exactly the matching rows
//! 3. The cleaning step never keeps a row with a missing field
//! 4. Larger profit or market value never ranks or tiers below a smaller one

use proptest::prelude::*;

use decklab_core::data::eastmoney::spot_header;
use decklab_core::quotes::{clean_quotes, col, Quote, QuoteSet};
use decklab_core::slides::common::{pick_n, ExclusionFilter, Order};
use decklab_core::Table;

// ── Strategies (proptest) ────────────────────────────────────────────

fn quote(i: usize, name: String, mv: f64) -> Quote {
    Quote {
        seq: 1.0,
        code: format!("{i:06}"),
        name,
        price: 1.0,
        change_pct: 0.0,
        change_amount: 0.0,
        volume: 0.0,
        turnover: 0.0,
        amplitude: 0.0,
        high: 1.0,
        low: 1.0,
        open: 1.0,
        prev_close: 1.0,
        volume_ratio: 0.0,
        turnover_rate: 0.0,
        pe: 10.0,
        pb: 1.0,
        total_market_value: mv,
        float_market_value: mv,
        speed: 0.0,
        change_5m: 0.0,
        change_60d: 0.0,
        change_ytd: 0.0,
        profit: mv / 10.0,
        net_assets: mv,
        profit_rank: 1.0,
        profit_percentile: 100.0,
        market_cap_rank: 1.0,
        market_cap_percentile: 100.0,
    }
}

fn arb_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "招商银行", "中信证券", "中国平安", "贵州茅台", "宁德时代", "比亚迪", "苏州商行",
        "中国人寿", "海康威视", "新华保险",
    ])
    .prop_map(String::from)
}

fn arb_quotes() -> impl Strategy<Value = Vec<Quote>> {
    prop::collection::vec((arb_name(), 0.0..1e4_f64), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (name, mv))| quote(i, name, (mv * 100.0).round() / 100.0))
            .collect()
    })
}

// ── 1. Top-N ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn top_n_size_order_and_uniqueness(quotes in arb_quotes(), n in 0usize..50) {
        let picked = pick_n(&quotes, |q| q.total_market_value, n, Order::Largest);
        prop_assert_eq!(picked.len(), n.min(quotes.len()));

        for pair in picked.windows(2) {
            prop_assert!(pair[0].total_market_value >= pair[1].total_market_value);
        }
        let mut codes: Vec<&str> = picked.iter().map(|q| q.code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        prop_assert_eq!(codes.len(), picked.len());

        // nothing left out is larger than the smallest picked value
        if let Some(last) = picked.last() {
            let outside = quotes
                .iter()
                .filter(|q| !picked.iter().any(|p| p.code == q.code))
                .all(|q| q.total_market_value <= last.total_market_value);
            prop_assert!(outside);
        }
    }

    #[test]
    fn bottom_n_is_ascending(quotes in arb_quotes(), n in 1usize..20) {
        let picked = pick_n(&quotes, |q| q.total_market_value, n, Order::Smallest);
        for pair in picked.windows(2) {
            prop_assert!(pair[0].total_market_value <= pair[1].total_market_value);
        }
    }
}

// ── 2. Exclusion filter ──────────────────────────────────────────────

proptest! {
    #[test]
    fn exclusion_removes_exactly_matching_rows(quotes in arb_quotes()) {
        let filter = ExclusionFilter::default();
        let set = QuoteSet { quotes: quotes.clone() };
        let kept = filter.apply(&set);

        let terms = ["银行", "证券", "保险", "中国", "商行"];
        let expected: Vec<&Quote> = quotes
            .iter()
            .filter(|q| !terms.iter().any(|t| q.name.contains(t)))
            .collect();
        prop_assert_eq!(kept.len(), expected.len());
        for (k, e) in kept.iter().zip(expected) {
            prop_assert_eq!(&k.code, &e.code);
        }
    }
}

// ── 3. Cleaning drops incomplete rows ────────────────────────────────

proptest! {
    #[test]
    fn cleaned_rows_are_complete(blanks in prop::collection::vec(prop::option::of(0usize..col::WIDTH), 1..20)) {
        let rows: Vec<Vec<String>> = blanks
            .iter()
            .enumerate()
            .map(|(i, blank)| {
                let mut r = vec!["3".to_string(); col::WIDTH];
                r[col::CODE] = format!("{i:06}");
                r[col::NAME] = format!("名称{i}");
                if let Some(b) = blank {
                    r[*b] = String::new();
                }
                r
            })
            .collect();
        let complete = blanks.iter().filter(|b| b.is_none()).count();

        let set = clean_quotes(&Table::with_rows(spot_header(), rows)).unwrap();
        prop_assert_eq!(set.len(), complete);
        for q in set.iter() {
            prop_assert!(q.profit.is_finite());
            prop_assert!(q.market_cap_percentile > 0.0 && q.market_cap_percentile <= 100.0);
        }
    }
}

// ── 4. Rank and percentile order ─────────────────────────────────────

proptest! {
    #[test]
    fn larger_values_rank_and_tier_higher(
        pairs in prop::collection::vec((1u32..200, 1u32..5000), 2..40)
    ) {
        let rows: Vec<Vec<String>> = pairs
            .iter()
            .enumerate()
            .map(|(i, (pe, mv))| {
                let mut r = vec!["1".to_string(); col::WIDTH];
                r[col::CODE] = format!("{i:06}");
                r[col::NAME] = format!("名称{i}");
                r[col::PE] = pe.to_string();
                r[col::TOTAL_MARKET_VALUE] = format!("{mv}e8");
                r
            })
            .collect();

        let set = clean_quotes(&Table::with_rows(spot_header(), rows)).unwrap();
        prop_assert_eq!(set.len(), pairs.len());
        for a in set.iter() {
            for b in set.iter() {
                if a.profit > b.profit {
                    prop_assert!(a.profit_rank <= b.profit_rank);
                    prop_assert!(a.profit_percentile >= b.profit_percentile);
                }
                if a.total_market_value > b.total_market_value {
                    prop_assert!(a.market_cap_rank <= b.market_cap_rank);
                    prop_assert!(a.market_cap_percentile >= b.market_cap_percentile);
                }
            }
        }
    }
}
