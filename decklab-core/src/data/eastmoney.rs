//! Eastmoney providers: full-market quote snapshot and the fast-news feed.
//!
//! The quote list API is paged; pages are fetched in order with the
//! configured pacing delay between them. Raw field codes are mapped onto
//! the 23 positional snapshot columns.

use serde::Deserialize;
use tracing::debug;

use super::http::{json_cell, HttpClient, HttpOptions};
use super::provider::{DataError, TableProvider};
use crate::table::Table;

pub const SPOT_URL: &str = "https://82.push2.eastmoney.com/api/qt/clist/get";
pub const NEWS_URL: &str = "https://np-weblist.eastmoney.com/comm/web/getFastNewsList";

const PAGE_SIZE: usize = 100;
const MARKET_FILTER: &str = "m:0 t:6,m:0 t:80,m:1 t:2,m:1 t:23,m:0 t:81 s:2048";

/// Snapshot header label and API field code, in positional order.
/// Position 0 (the sequence counter) is generated locally.
pub const SPOT_COLUMNS: [(&str, &str); 23] = [
    ("序号", ""),
    ("代码", "f12"),
    ("名称", "f14"),
    ("最新价", "f2"),
    ("涨跌幅", "f3"),
    ("涨跌额", "f4"),
    ("成交量", "f5"),
    ("成交额", "f6"),
    ("振幅", "f7"),
    ("最高", "f15"),
    ("最低", "f16"),
    ("今开", "f17"),
    ("昨收", "f18"),
    ("量比", "f10"),
    ("换手率", "f8"),
    ("市盈率-动态", "f9"),
    ("市净率", "f23"),
    ("总市值", "f20"),
    ("流通市值", "f21"),
    ("涨速", "f22"),
    ("5分钟涨跌", "f11"),
    ("60日涨跌幅", "f24"),
    ("年初至今涨跌幅", "f25"),
];

#[derive(Debug, Deserialize)]
struct ClistResponse {
    data: Option<ClistData>,
}

#[derive(Debug, Deserialize)]
struct ClistData {
    total: usize,
    #[serde(default)]
    diff: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Full-market A-share quote snapshot.
pub struct SpotQuoteProvider {
    client: HttpClient,
    options: HttpOptions,
    url: String,
}

impl SpotQuoteProvider {
    pub fn new(options: HttpOptions, url: impl Into<String>) -> Result<Self, DataError> {
        Ok(Self {
            client: HttpClient::new(&options)?,
            options,
            url: url.into(),
        })
    }

    fn fetch_page(&self, page: usize) -> Result<ClistData, DataError> {
        let fields = SPOT_COLUMNS
            .iter()
            .filter(|(_, code)| !code.is_empty())
            .map(|(_, code)| *code)
            .collect::<Vec<_>>()
            .join(",");
        let query = [
            ("pn", page.to_string()),
            ("pz", PAGE_SIZE.to_string()),
            ("po", "1".to_string()),
            ("np", "1".to_string()),
            ("ut", "bd1d9ddb04089700cf9c27f6f7426281".to_string()),
            ("fltt", "2".to_string()),
            ("invt", "2".to_string()),
            ("fid", "f12".to_string()),
            ("fs", MARKET_FILTER.to_string()),
            ("fields", fields),
        ];
        let resp: ClistResponse = self.client.get_json(&self.url, &query)?;
        resp.data
            .ok_or_else(|| DataError::Decode(format!("quote page {page} carried no data")))
    }
}

/// Convert raw quote records to positional rows, numbering from `first_seq`.
fn spot_rows(
    records: &[serde_json::Map<String, serde_json::Value>],
    first_seq: usize,
) -> Vec<Vec<String>> {
    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            SPOT_COLUMNS
                .iter()
                .map(|(_, code)| {
                    if code.is_empty() {
                        (first_seq + i).to_string()
                    } else {
                        json_cell(rec.get(*code))
                    }
                })
                .collect()
        })
        .collect()
}

pub fn spot_header() -> Vec<String> {
    SPOT_COLUMNS.iter().map(|(name, _)| name.to_string()).collect()
}

impl TableProvider for SpotQuoteProvider {
    fn name(&self) -> &str {
        "eastmoney_spot"
    }

    fn fetch_table(&self, _resource: &str) -> Result<Table, DataError> {
        let mut table = Table::new(spot_header());
        let mut page = 1;
        loop {
            if page > 1 {
                self.options.pace();
            }
            let data = self.fetch_page(page)?;
            if data.diff.is_empty() {
                break;
            }
            let rows = spot_rows(&data.diff, table.len() + 1);
            table.rows.extend(rows);
            debug!(page, rows = table.len(), total = data.total, "quote page fetched");
            if table.len() >= data.total {
                break;
            }
            page += 1;
        }
        Ok(table)
    }
}

// ── News feed ───────────────────────────────────────────────────────

pub const NEWS_COLUMNS: [&str; 4] = ["标题", "摘要", "发布时间", "链接"];

#[derive(Debug, Deserialize)]
struct FastNewsResponse {
    data: Option<FastNewsData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FastNewsData {
    #[serde(default)]
    fast_news_list: Vec<FastNewsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FastNewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    show_time: String,
    #[serde(default)]
    code: String,
}

/// Eastmoney 7×24 fast news feed.
pub struct FastNewsProvider {
    client: HttpClient,
    url: String,
}

impl FastNewsProvider {
    pub fn new(options: &HttpOptions, url: impl Into<String>) -> Result<Self, DataError> {
        Ok(Self {
            client: HttpClient::new(options)?,
            url: url.into(),
        })
    }
}

impl TableProvider for FastNewsProvider {
    fn name(&self) -> &str {
        "eastmoney_news"
    }

    fn fetch_table(&self, _resource: &str) -> Result<Table, DataError> {
        let query = [
            ("client", "web".to_string()),
            ("biz", "web_724".to_string()),
            ("fastColumn", "102".to_string()),
            ("sortEnd", String::new()),
            ("pageSize", "200".to_string()),
            ("req_trace", "decklab".to_string()),
        ];
        let resp: FastNewsResponse = self.client.get_json(&self.url, &query)?;
        let items = resp
            .data
            .ok_or_else(|| DataError::Decode("news feed carried no data".into()))?
            .fast_news_list;
        let rows = items
            .into_iter()
            .map(|item| {
                let link = if item.code.is_empty() {
                    String::new()
                } else {
                    format!("https://finance.eastmoney.com/a/{}.html", item.code)
                };
                vec![item.title, item.summary, item.show_time, link]
            })
            .collect();
        Ok(Table::with_rows(
            NEWS_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spot_rows_follow_positional_layout() {
        let rec = json!({
            "f12": "600519", "f14": "贵州茅台", "f2": 1500.0, "f3": 1.2,
            "f9": "-", "f20": 1.9e12
        });
        let records = vec![rec.as_object().unwrap().clone()];
        let rows = spot_rows(&records, 7);
        assert_eq!(rows[0].len(), 23);
        assert_eq!(rows[0][0], "7");
        assert_eq!(rows[0][1], "600519");
        assert_eq!(rows[0][2], "贵州茅台");
        assert_eq!(rows[0][3].parse::<f64>().unwrap(), 1500.0);
        assert_eq!(rows[0][15], "", "'-' placeholder is missing");
        assert_eq!(rows[0][17].parse::<f64>().unwrap(), 1.9e12);
    }

    #[test]
    fn header_labels_are_positional() {
        let header = spot_header();
        assert_eq!(header.len(), 23);
        assert_eq!(header[7], "成交额");
        assert_eq!(header[15], "市盈率-动态");
        assert_eq!(header[17], "总市值");
    }

    #[test]
    fn news_response_decodes() {
        let body = json!({"data": {"fastNewsList": [
            {"title": "标题", "summary": "【快讯】内容", "showTime": "2026-10-17 09:30:00", "code": "2026"}
        ]}});
        let resp: FastNewsResponse = serde_json::from_value(body).unwrap();
        let items = resp.data.unwrap().fast_news_list;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].show_time, "2026-10-17 09:30:00");
    }
}
