//! Group-by rollups over long-format (date, category, value) rows.

use polars::prelude::*;
use std::collections::BTreeMap;

use crate::dataset::Pivot;

/// Per-category aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub members: f64,
}

fn long_frame(dates: Vec<String>, categories: Vec<String>, values: Vec<f64>) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new("date".into(), dates),
        Column::new("category".into(), categories),
        Column::new("value".into(), values),
    ])
}

/// Pivot `(date, category, value)` rows into date × category matrices of
/// value sums and row counts. Dates and categories come out ascending.
pub fn pivot_sum_count(rows: &[(String, String, f64)]) -> PolarsResult<(Pivot, Pivot)> {
    if rows.is_empty() {
        return Ok((Pivot::default(), Pivot::default()));
    }
    let df = long_frame(
        rows.iter().map(|r| r.0.clone()).collect(),
        rows.iter().map(|r| r.1.clone()).collect(),
        rows.iter().map(|r| r.2).collect(),
    )?;

    let agg = df
        .lazy()
        .group_by([col("date"), col("category")])
        .agg([
            col("value").sum().alias("total"),
            col("value").count().cast(DataType::Float64).alias("members"),
        ])
        .sort(["date", "category"], SortMultipleOptions::default())
        .collect()?;

    let dates = agg.column("date")?.str()?;
    let cats = agg.column("category")?.str()?;
    let totals = agg.column("total")?.f64()?;
    let members = agg.column("members")?.f64()?;

    let mut date_index: BTreeMap<String, usize> = BTreeMap::new();
    let mut cat_index: BTreeMap<String, usize> = BTreeMap::new();
    for i in 0..agg.height() {
        date_index.insert(dates.get(i).unwrap_or_default().to_string(), 0);
        cat_index.insert(cats.get(i).unwrap_or_default().to_string(), 0);
    }
    for (i, v) in date_index.values_mut().enumerate() {
        *v = i;
    }
    for (i, v) in cat_index.values_mut().enumerate() {
        *v = i;
    }

    let blank = || vec![vec![f64::NAN; cat_index.len()]; date_index.len()];
    let mut sum_values = blank();
    let mut count_values = blank();
    for i in 0..agg.height() {
        let d = date_index[dates.get(i).unwrap_or_default()];
        let c = cat_index[cats.get(i).unwrap_or_default()];
        sum_values[d][c] = totals.get(i).unwrap_or(f64::NAN);
        count_values[d][c] = members.get(i).unwrap_or(f64::NAN);
    }

    let date_labels: Vec<String> = date_index.into_keys().collect();
    let cat_labels: Vec<String> = cat_index.into_keys().collect();
    Ok((
        Pivot {
            dates: date_labels.clone(),
            categories: cat_labels.clone(),
            values: sum_values,
        },
        Pivot {
            dates: date_labels,
            categories: cat_labels,
            values: count_values,
        },
    ))
}

/// Sum and count `values` per category, largest total first.
pub fn totals_by_category(rows: &[(String, f64)]) -> PolarsResult<Vec<CategoryTotal>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let df = DataFrame::new(vec![
        Column::new(
            "category".into(),
            rows.iter().map(|r| r.0.clone()).collect::<Vec<_>>(),
        ),
        Column::new("value".into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
    ])?;

    let agg = df
        .lazy()
        .group_by([col("category")])
        .agg([
            col("value").sum().alias("total"),
            col("value").count().cast(DataType::Float64).alias("members"),
        ])
        .sort(
            ["total", "category"],
            SortMultipleOptions::default()
                .with_order_descending_multi([true, false])
                .with_maintain_order(true),
        )
        .collect()?;

    let cats = agg.column("category")?.str()?;
    let totals = agg.column("total")?.f64()?;
    let members = agg.column("members")?.f64()?;
    Ok((0..agg.height())
        .map(|i| CategoryTotal {
            category: cats.get(i).unwrap_or_default().to_string(),
            total: totals.get(i).unwrap_or(f64::NAN),
            members: members.get(i).unwrap_or(f64::NAN),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(d: &str, c: &str, v: f64) -> (String, String, f64) {
        (d.into(), c.into(), v)
    }

    #[test]
    fn pivots_sums_and_counts() {
        let rows = vec![
            r("2026-08-31", "电子", 10.0),
            r("2026-08-31", "电子", 5.0),
            r("2026-08-31", "银行", 7.0),
            r("2026-09-30", "电子", 20.0),
        ];
        let (sum, count) = pivot_sum_count(&rows).unwrap();
        assert_eq!(sum.dates, vec!["2026-08-31", "2026-09-30"]);
        assert_eq!(sum.categories, vec!["电子", "银行"]);
        assert_eq!(sum.get(0, 0), 15.0);
        assert_eq!(sum.get(0, 1), 7.0);
        assert_eq!(sum.get(1, 0), 20.0);
        assert!(sum.get(1, 1).is_nan());
        assert_eq!(count.get(0, 0), 2.0);
        assert_eq!(count.get(1, 0), 1.0);
        assert_eq!(sum.series(0), vec![15.0, 20.0]);
        assert_eq!(sum.latest(), Some(1));
    }

    #[test]
    fn empty_input_gives_empty_pivots() {
        let (sum, count) = pivot_sum_count(&[]).unwrap();
        assert!(sum.dates.is_empty());
        assert!(count.categories.is_empty());
        assert_eq!(sum.latest(), None);
    }

    #[test]
    fn totals_sorted_descending() {
        let rows = vec![
            ("银行".to_string(), 3.0),
            ("电子".to_string(), 4.0),
            ("银行".to_string(), 2.0),
        ];
        let totals = totals_by_category(&rows).unwrap();
        assert_eq!(totals[0].category, "银行");
        assert_eq!(totals[0].total, 5.0);
        assert_eq!(totals[0].members, 2.0);
        assert_eq!(totals[1].category, "电子");
    }
}
