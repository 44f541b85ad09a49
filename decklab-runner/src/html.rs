//! Static HTML slideshow renderer.
//!
//! Each deck becomes one `<section>` fragment (tabular decks become a group
//! of vertical sub-slides, one per page of `rows_per_page` rows). Fragments
//! are concatenated in deck order and wrapped in the page shell, which
//! embeds the chart options as a JSON script block.

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use decklab_core::deck::{Cell, ChartOptions, Deck, DeckContent, Record, TableData};
use decklab_core::{Render, RenderError};

use crate::templates::TEMPLATES;

pub struct HtmlRender {
    output_dir: PathBuf,
    registry: Handlebars<'static>,
}

#[derive(Serialize)]
struct Page<T> {
    page: usize,
    rows: Vec<T>,
}

#[derive(Clone, Serialize)]
struct Labelled {
    label: String,
    value: String,
}

impl HtmlRender {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        for (name, source) in TEMPLATES {
            registry
                .register_template_string(name, source)
                .map_err(|e| RenderError::Template {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
        }
        Ok(Self {
            output_dir: output_dir.into(),
            registry,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path a page named `output_name` is written to.
    pub fn output_path(&self, output_name: &str) -> PathBuf {
        self.output_dir.join(format!("{output_name}.html"))
    }

    pub(crate) fn render_template(&self, name: &str, data: &Value) -> Result<String, RenderError> {
        self.registry
            .render(name, data)
            .map_err(|e| RenderError::Template {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    /// Render one deck to its `<section>` fragment.
    pub fn render_deck(&self, deck: &Deck) -> Result<String, RenderError> {
        let template = deck.kind().template_name();
        self.render_template(template, &deck_context(deck))
    }

    /// Write `content` to `path` via a sibling temp file and rename.
    pub(crate) fn write_atomic(&self, path: &Path, content: &str) -> Result<(), RenderError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| RenderError::Io { path, source }
        };
        fs::create_dir_all(&self.output_dir).map_err(io_err(&self.output_dir))?;
        let tmp = path.with_extension("html.tmp");
        fs::write(&tmp, content).map_err(io_err(&tmp))?;
        fs::rename(&tmp, path).map_err(io_err(path))?;
        Ok(())
    }
}

/// JSON text safe to embed inside a `<script>` element.
pub fn script_json(options: &ChartOptions) -> Result<String, RenderError> {
    Ok(serde_json::to_string(options)?.replace("</", "<\\/"))
}

fn paginate<T: Clone>(rows: &[T], per_page: usize) -> Vec<Page<T>> {
    if rows.is_empty() {
        return vec![Page {
            page: 1,
            rows: Vec::new(),
        }];
    }
    rows.chunks(per_page.max(1))
        .enumerate()
        .map(|(i, chunk)| Page {
            page: i + 1,
            rows: chunk.to_vec(),
        })
        .collect()
}

fn text_rows(table: &TableData) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|r| r.iter().map(Cell::to_string).collect())
        .collect()
}

fn labelled(pairs: &[(String, Cell)]) -> Vec<Labelled> {
    pairs
        .iter()
        .map(|(label, value)| Labelled {
            label: label.clone(),
            value: value.to_string(),
        })
        .collect()
}

fn deck_context(deck: &Deck) -> Value {
    let title = deck.title.clone().unwrap_or_default();
    match &deck.content {
        DeckContent::Cover { subtitle } => json!({ "title": title, "subtitle": subtitle }),
        DeckContent::Table(table) | DeckContent::StatsCard(table) => {
            let pages = paginate(&text_rows(table), deck.rows_per_page);
            json!({
                "title": title,
                "columns": table.columns,
                "paged": pages.len() > 1,
                "page_count": pages.len(),
                "pages": pages,
            })
        }
        DeckContent::ScalarCards(cards) => json!({ "title": title, "cards": labelled(cards) }),
        DeckContent::Chart { key } => json!({ "title": title, "key": key }),
        DeckContent::News { excerpt, published } => json!({
            "title": title,
            "excerpt": excerpt,
            "published": published,
        }),
        DeckContent::Images(images) => json!({ "title": title, "images": images }),
        DeckContent::Records(records) => {
            let rows: Vec<Vec<Labelled>> = records.iter().map(|r: &Record| labelled(r)).collect();
            json!({ "title": title, "pages": paginate(&rows, deck.rows_per_page) })
        }
    }
}

impl Render for HtmlRender {
    fn render_page(
        &self,
        decks: &[Deck],
        output_name: &str,
        chart_options: &ChartOptions,
    ) -> Result<PathBuf, RenderError> {
        let mut sections = Vec::with_capacity(decks.len());
        for deck in decks {
            sections.push(self.render_deck(deck)?);
        }
        debug!(output_name, decks = decks.len(), "decks rendered");

        let page = self.render_template(
            "page",
            &json!({
                "title": output_name,
                "sections": sections.join("\n"),
                "chart_options": script_json(chart_options)?,
            }),
        )?;

        let path = self.output_path(output_name);
        self.write_atomic(&path, &page)?;
        info!(path = %path.display(), "page written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_deck(rows: usize, per_page: usize) -> Deck {
        let data = TableData::new(
            vec!["名称".into(), "涨跌幅".into()],
            (0..rows)
                .map(|i| vec![Cell::from(format!("股票{i}")), Cell::Number(i as f64)])
                .collect(),
        );
        Deck::table("成交额", data).with_rows_per_page(per_page)
    }

    #[test]
    fn table_is_split_into_pages() {
        let render = HtmlRender::new("unused").unwrap();
        let html = render.render_deck(&table_deck(25, 10)).unwrap();
        assert_eq!(html.matches("<tbody>").count(), 3);
        assert!(html.contains("成交额 (3/3)"));
        assert!(html.contains("<td>股票24</td>"));
    }

    #[test]
    fn empty_table_keeps_its_header() {
        let render = HtmlRender::new("unused").unwrap();
        let html = render.render_deck(&table_deck(0, 10)).unwrap();
        assert_eq!(html.matches("<tbody>").count(), 1);
        assert!(html.contains("<th>名称</th>"));
    }

    #[test]
    fn text_is_escaped() {
        let render = HtmlRender::new("unused").unwrap();
        let deck = Deck::cover("<b>x</b>", "a & b");
        let html = render.render_deck(&deck).unwrap();
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    #[test]
    fn script_json_escapes_closing_tags() {
        let mut options = ChartOptions::new();
        options.insert("t".into(), json!({"name": "</script><script>alert(1)"}));
        let s = script_json(&options).unwrap();
        assert!(!s.contains("</"));
        assert!(s.contains("<\\/script>"));
    }

    #[test]
    fn nan_cells_render_as_dash() {
        let render = HtmlRender::new("unused").unwrap();
        let deck = Deck::titled(
            "统计描述",
            DeckContent::StatsCard(TableData::new(
                vec!["".into(), "市盈率".into()],
                vec![vec![Cell::from("mean"), Cell::Number(f64::NAN)]],
            )),
        );
        let html = render.render_deck(&deck).unwrap();
        assert!(html.contains("<td>-</td>"));
    }
}
