//! Raw positional row collections as returned by providers and stored in the cache.
//!
//! Every cell is kept as the provider's text rendering. An empty cell means
//! "missing". Column order is part of the contract: downstream cleaning reads
//! fields by index.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::data::DataError;

/// Tabular payload of one fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column by header label.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Same as [`Table::index_of`] but a missing column is a schema error.
    pub fn require(&self, name: &str) -> Result<usize, DataError> {
        self.index_of(name)
            .ok_or_else(|| DataError::Schema(format!("missing column '{name}'")))
    }

    /// Cell at (row, col); rows shorter than the header read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table, DataError> {
        let idx: Vec<usize> = names
            .iter()
            .map(|n| self.require(n))
            .collect::<Result<_, _>>()?;
        let rows = self
            .rows
            .iter()
            .map(|r| {
                idx.iter()
                    .map(|&i| r.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Ok(Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }

    /// Append rows of `other` whose full content is not already present.
    ///
    /// Both tables must share the same header.
    pub fn merge_distinct(&mut self, other: &Table) -> Result<usize, DataError> {
        if self.columns.is_empty() {
            self.columns = other.columns.clone();
        }
        if self.columns != other.columns {
            return Err(DataError::Schema(format!(
                "cannot merge tables with different headers: {:?} vs {:?}",
                self.columns, other.columns
            )));
        }
        let mut seen: std::collections::HashSet<Vec<String>> =
            self.rows.iter().cloned().collect();
        let mut added = 0;
        for row in &other.rows {
            if seen.insert(row.clone()) {
                self.rows.push(row.clone());
                added += 1;
            }
        }
        Ok(added)
    }

    // ── CSV I/O ─────────────────────────────────────────────────────

    pub fn read_csv<R: Read>(reader: R) -> Result<Table, DataError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let columns = rdr
            .headers()
            .map_err(|e| DataError::Cache(format!("csv header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| DataError::Cache(format!("csv record: {e}")))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Table { columns, rows })
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), DataError> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        wtr.write_record(&self.columns)
            .map_err(|e| DataError::Cache(format!("csv header: {e}")))?;
        for row in &self.rows {
            wtr.write_record(row)
                .map_err(|e| DataError::Cache(format!("csv record: {e}")))?;
        }
        wtr.flush()
            .map_err(|e| DataError::Cache(format!("csv flush: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::with_rows(
            vec!["code".into(), "name".into(), "pe".into()],
            vec![
                vec!["000001".into(), "平安银行".into(), "4.5".into()],
                vec!["600519".into(), "贵州茅台".into(), "".into()],
            ],
        )
    }

    #[test]
    fn csv_preserves_empty_cells_and_unicode() {
        let table = sample();
        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let back = Table::read_csv(buf.as_slice()).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.cell(1, 2), "");
    }

    #[test]
    fn select_reorders_and_rejects_unknown() {
        let table = sample();
        let picked = table.select(&["name", "code"]).unwrap();
        assert_eq!(picked.columns, vec!["name", "code"]);
        assert_eq!(picked.rows[0], vec!["平安银行", "000001"]);
        assert!(matches!(
            table.select(&["missing"]),
            Err(DataError::Schema(_))
        ));
    }

    #[test]
    fn merge_distinct_skips_duplicates() {
        let mut base = sample();
        let mut incoming = sample();
        incoming.push_row(vec!["000002".into(), "万科A".into(), "9".into()]);
        let added = base.merge_distinct(&incoming).unwrap();
        assert_eq!(added, 1);
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn short_rows_read_as_missing() {
        let mut t = Table::new(vec!["a".into(), "b".into()]);
        t.push_row(vec!["1".into()]);
        assert_eq!(t.cell(0, 1), "");
        assert_eq!(t.cell(5, 0), "");
    }
}
