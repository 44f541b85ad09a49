//! Index-composition spreadsheet download (cnindex.com.cn).
//!
//! The site serves an XLSX workbook; the first worksheet is decoded into a
//! raw [`Table`] with the sheet's first row as header.

use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

use super::http::{HttpClient, HttpOptions};
use super::provider::{DataError, TableProvider};
use crate::table::Table;

pub const COMPOSITION_URL: &str =
    "https://www.cnindex.com.cn/sample-detail/download-history?indexcode=399317";
const REFERER: &str =
    "https://www.cnindex.com.cn/module/index-detail.html?act_menu=1&indexCode=399317";

/// Fetches an index's historical sample workbook.
pub struct CompositionProvider {
    client: HttpClient,
    url: String,
}

impl CompositionProvider {
    pub fn new(options: &HttpOptions, url: impl Into<String>) -> Result<Self, DataError> {
        Ok(Self {
            client: HttpClient::new(options)?,
            url: url.into(),
        })
    }
}

impl TableProvider for CompositionProvider {
    fn name(&self) -> &str {
        "cnindex_composition"
    }

    fn fetch_table(&self, _resource: &str) -> Result<Table, DataError> {
        let headers = [
            ("Referer", REFERER),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8"),
        ];
        let bytes = self.client.get_bytes(&self.url, &headers)?;
        decode_xlsx(&bytes)
    }
}

/// Decode the first worksheet of an XLSX workbook.
pub fn decode_xlsx(bytes: &[u8]) -> Result<Table, DataError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| DataError::Decode(format!("not a readable xlsx workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataError::Decode("workbook has no worksheets".into()))?
        .map_err(|e| DataError::Decode(format!("worksheet: {e}")))?;

    let mut rows = range.rows();
    let columns = match rows.next() {
        Some(header) => header.iter().map(cell_text).collect(),
        None => return Ok(Table::default()),
    };
    let mut table = Table::new(columns);
    for row in rows {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        if cells.iter().all(String::is_empty) {
            continue;
        }
        table.push_row(cells);
    }
    Ok(table)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.date().format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.chars().take(10).collect(),
    }
}
