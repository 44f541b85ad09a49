//! Deck model: one logical slide (or a paginated group of slides).
//!
//! A deck's content is a tagged sum type; the variant decides which
//! template the renderer picks. Decks are immutable once a builder returns
//! them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default number of rows shown per rendered page of a tabular deck.
pub const DEFAULT_ROWS_PER_PAGE: usize = 10;

/// Chart title → renderer-agnostic chart option structure.
pub type ChartOptions = BTreeMap<String, serde_json::Value>;

/// Which template renders a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Cover,
    Table,
    ScalarCards,
    StatsCard,
    Chart,
    News,
    Image,
    Records,
}

impl TemplateKind {
    /// Template identifier used by renderers.
    pub fn template_name(self) -> &'static str {
        match self {
            TemplateKind::Cover => "cover",
            TemplateKind::Table => "table",
            TemplateKind::ScalarCards => "scard",
            TemplateKind::StatsCard => "tcard",
            TemplateKind::Chart => "chart",
            TemplateKind::News => "news",
            TemplateKind::Image => "img",
            TemplateKind::Records => "stock",
        }
    }
}

/// A single displayed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) if v.is_nan() => f.write_str("-"),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

/// Column-labelled grid of cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl TableData {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Labelled values describing one entity.
pub type Record = Vec<(String, Cell)>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub src: String,
    pub caption: String,
}

/// Deck payload, keyed by template kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum DeckContent {
    Cover { subtitle: String },
    Table(TableData),
    ScalarCards(Vec<(String, Cell)>),
    StatsCard(TableData),
    /// Placeholder for a chart; `key` indexes into the page's [`ChartOptions`].
    Chart { key: String },
    News {
        excerpt: String,
        published: Option<String>,
    },
    Images(Vec<ImageRef>),
    Records(Vec<Record>),
}

impl DeckContent {
    pub fn kind(&self) -> TemplateKind {
        match self {
            DeckContent::Cover { .. } => TemplateKind::Cover,
            DeckContent::Table(_) => TemplateKind::Table,
            DeckContent::ScalarCards(_) => TemplateKind::ScalarCards,
            DeckContent::StatsCard(_) => TemplateKind::StatsCard,
            DeckContent::Chart { .. } => TemplateKind::Chart,
            DeckContent::News { .. } => TemplateKind::News,
            DeckContent::Images(_) => TemplateKind::Image,
            DeckContent::Records(_) => TemplateKind::Records,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub title: Option<String>,
    pub rows_per_page: usize,
    pub content: DeckContent,
}

impl Deck {
    pub fn new(content: DeckContent) -> Self {
        Self {
            title: None,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            content,
        }
    }

    pub fn titled(title: impl Into<String>, content: DeckContent) -> Self {
        Self::new(content).with_title(title)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_rows_per_page(mut self, n: usize) -> Self {
        self.rows_per_page = n.max(1);
        self
    }

    pub fn cover(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self::titled(
            title,
            DeckContent::Cover {
                subtitle: subtitle.into(),
            },
        )
    }

    pub fn table(title: impl Into<String>, data: TableData) -> Self {
        Self::titled(title, DeckContent::Table(data))
    }

    /// Chart deck whose option entry is keyed by its title.
    pub fn chart(title: impl Into<String>) -> Self {
        let title = title.into();
        Self::titled(title.clone(), DeckContent::Chart { key: title })
    }

    pub fn kind(&self) -> TemplateKind {
        self.content.kind()
    }

    /// Number of tabular entries carried by the deck (1 for scalar kinds).
    pub fn item_count(&self) -> usize {
        match &self.content {
            DeckContent::Table(t) | DeckContent::StatsCard(t) => t.len(),
            DeckContent::ScalarCards(c) => c.len(),
            DeckContent::Images(i) => i.len(),
            DeckContent::Records(r) => r.len(),
            DeckContent::Cover { .. } | DeckContent::Chart { .. } | DeckContent::News { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_variant_decides_template() {
        assert_eq!(Deck::cover("t", "s").kind(), TemplateKind::Cover);
        assert_eq!(Deck::chart("c").kind().template_name(), "chart");
        let stats = Deck::new(DeckContent::StatsCard(TableData::default()));
        assert_eq!(stats.kind().template_name(), "tcard");
    }

    #[test]
    fn chart_key_matches_title() {
        let d = Deck::chart("市值前10");
        assert_eq!(d.title.as_deref(), Some("市值前10"));
        assert_eq!(
            d.content,
            DeckContent::Chart {
                key: "市值前10".into()
            }
        );
    }

    #[test]
    fn rows_per_page_defaults_and_clamps() {
        let d = Deck::table("x", TableData::default());
        assert_eq!(d.rows_per_page, DEFAULT_ROWS_PER_PAGE);
        assert_eq!(d.with_rows_per_page(0).rows_per_page, 1);
    }

    #[test]
    fn nan_cells_display_as_dash() {
        assert_eq!(Cell::Number(f64::NAN).to_string(), "-");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
        assert_eq!(Cell::from("abc").to_string(), "abc");
    }
}
