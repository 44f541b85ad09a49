//! Picture-news page scraper (chinanews.com.cn).
//!
//! Reads the static DOM only. Entries come from the `docArr` script literal
//! when the page embeds one, otherwise from the `ul.news_list_ul#ent0` list.

use scraper::{Html, Selector};
use tracing::debug;

use super::http::{HttpClient, HttpOptions};
use super::provider::{DataError, TableProvider};
use crate::table::Table;

pub const PICTURE_PAGE_URL: &str = "https://channel.chinanews.com.cn/u/pic/news.shtml";
pub const IMAGE_COLUMNS: [&str; 3] = ["序号", "图片", "标题"];

pub struct PicturePageProvider {
    client: HttpClient,
    url: String,
}

impl PicturePageProvider {
    pub fn new(options: &HttpOptions, url: impl Into<String>) -> Result<Self, DataError> {
        Ok(Self {
            client: HttpClient::new(options)?,
            url: url.into(),
        })
    }
}

impl TableProvider for PicturePageProvider {
    fn name(&self) -> &str {
        "chinanews_pictures"
    }

    fn fetch_table(&self, _resource: &str) -> Result<Table, DataError> {
        let html = self.client.get_text(&self.url)?;
        parse_picture_page(&html, &self.url)
    }
}

/// Extract (image URL, caption) pairs from a picture-news page.
pub fn parse_picture_page(html: &str, page_url: &str) -> Result<Table, DataError> {
    let mut pairs = doc_array_entries(html);
    if pairs.is_empty() {
        pairs = dom_entries(html)?;
    } else {
        debug!(entries = pairs.len(), "read entries from docArr literal");
    }

    let rows = pairs
        .into_iter()
        .enumerate()
        .map(|(i, (src, title))| vec![(i + 1).to_string(), absolute_url(&src, page_url), title])
        .collect();
    Ok(Table::with_rows(
        IMAGE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    ))
}

fn dom_entries(html: &str) -> Result<Vec<(String, String)>, DataError> {
    let selector = |s: &str| {
        Selector::parse(s).map_err(|e| DataError::Decode(format!("bad selector '{s}': {e:?}")))
    };
    let item_sel = selector("ul.news_list_ul#ent0 li")?;
    let img_sel = selector(".left img")?;
    let title_sel = selector(".news_title")?;

    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for item in doc.select(&item_sel) {
        let src = item
            .select(&img_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .unwrap_or_default();
        let title = item
            .select(&title_sel)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        if !src.is_empty() && !title.is_empty() {
            out.push((src.to_string(), title));
        }
    }
    Ok(out)
}

/// Entries of a `docArr = [...]` literal, when it is valid JSON.
fn doc_array_entries(html: &str) -> Vec<(String, String)> {
    let Some(start) = html.find("docArr") else {
        return Vec::new();
    };
    let rest = &html[start..];
    let Some(open) = rest.find('[') else {
        return Vec::new();
    };
    let Some(literal) = balanced_brackets(&rest[open..]) else {
        return Vec::new();
    };
    let Ok(serde_json::Value::Array(items)) = serde_json::from_str(literal) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|doc| {
            let img = doc.get("img")?.as_str()?;
            let title = doc.get("title")?.as_str()?;
            (!img.is_empty() && !title.is_empty()).then(|| (img.to_string(), title.to_string()))
        })
        .collect()
}

fn balanced_brackets(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn absolute_url(src: &str, page_url: &str) -> String {
    if src.starts_with("//") {
        return format!("https:{src}");
    }
    if src.starts_with('/') {
        if let Some(scheme_end) = page_url.find("://") {
            let host_end = page_url[scheme_end + 3..]
                .find('/')
                .map(|i| scheme_end + 3 + i)
                .unwrap_or(page_url.len());
            return format!("{}{src}", &page_url[..host_end]);
        }
    }
    src.to_string()
}
