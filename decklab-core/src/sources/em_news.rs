//! 7×24 fast-news feed, one slide per item.

use crate::data::eastmoney::FastNewsProvider;
use crate::data::{DataError, DataLoader, FetchContext, Granularity, HttpOptions, TableProvider};
use crate::dataset::{Dataset, NewsItem};
use crate::deck::{Deck, DeckContent};
use crate::slides::common::strip_bracket_tags;
use crate::slides::{unexpected, warn_if_empty, BuildError, SlideSet, SlidesBuilder};
use crate::table::Table;

pub const SOURCE_ID: &str = "em_news";

pub struct EmNewsLoader {
    provider: Box<dyn TableProvider>,
    ctx: FetchContext,
}

impl EmNewsLoader {
    pub fn new(provider: Box<dyn TableProvider>, ctx: FetchContext) -> Self {
        Self { provider, ctx }
    }

    pub fn connect(options: &HttpOptions, url: &str, ctx: FetchContext) -> Result<Self, DataError> {
        let provider = FastNewsProvider::new(options, url)?;
        Ok(Self::new(Box::new(provider), ctx))
    }
}

/// Keep headline, excerpt and timestamp; rows without a headline are dropped.
pub fn parse_news(table: &Table) -> Result<Vec<NewsItem>, DataError> {
    let headline = table.require("标题")?;
    let excerpt = table.require("摘要")?;
    let published = table.require("发布时间")?;
    Ok((0..table.len())
        .filter(|&r| !table.cell(r, headline).trim().is_empty())
        .map(|r| NewsItem {
            headline: table.cell(r, headline).trim().to_string(),
            excerpt: table.cell(r, excerpt).to_string(),
            published: table.cell(r, published).to_string(),
        })
        .collect())
}

impl DataLoader for EmNewsLoader {
    fn name(&self) -> &'static str {
        "EmNewsLoader"
    }

    fn fetch(&self, source_id: &str) -> Result<Table, DataError> {
        self.ctx
            .cached(source_id, Granularity::Daily, self.provider.as_ref(), "")
    }

    fn clean(&self, source_id: &str) -> Result<Dataset, DataError> {
        Ok(Dataset::News(parse_news(&self.fetch(source_id)?)?))
    }
}

#[derive(Debug, Default)]
pub struct EmNewsBuilder;

impl SlidesBuilder for EmNewsBuilder {
    fn name(&self) -> &'static str {
        "EmNewsBuilder"
    }

    fn build(&self, data: Dataset) -> Result<SlideSet, BuildError> {
        warn_if_empty(self.name(), &data);
        let items = match data {
            Dataset::News(n) => n,
            other => return Err(unexpected(self.name(), "news", &other)),
        };

        let mut set = SlideSet::default();
        for item in items {
            let published = (!item.published.is_empty()).then_some(item.published);
            set.push(Deck::titled(
                item.headline,
                DeckContent::News {
                    excerpt: strip_bracket_tags(&item.excerpt),
                    published,
                },
            ));
        }
        Ok(set)
    }
}
