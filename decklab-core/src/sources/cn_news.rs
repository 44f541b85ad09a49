//! Picture news: image URLs and captions scraped from a static page.

use chrono::NaiveDate;

use crate::data::chinanews::PicturePageProvider;
use crate::data::{DataError, DataLoader, FetchContext, Granularity, HttpOptions, TableProvider};
use crate::dataset::{Dataset, ImageItem};
use crate::deck::{Deck, DeckContent, ImageRef};
use crate::slides::{unexpected, warn_if_empty, BuildError, SlideSet, SlidesBuilder};
use crate::table::Table;

pub const SOURCE_ID: &str = "cn_news";

pub struct CnNewsLoader {
    provider: Box<dyn TableProvider>,
    ctx: FetchContext,
}

impl CnNewsLoader {
    pub fn new(provider: Box<dyn TableProvider>, ctx: FetchContext) -> Self {
        Self { provider, ctx }
    }

    pub fn connect(options: &HttpOptions, url: &str, ctx: FetchContext) -> Result<Self, DataError> {
        let provider = PicturePageProvider::new(options, url)?;
        Ok(Self::new(Box::new(provider), ctx))
    }
}

pub fn parse_images(table: &Table) -> Result<Vec<ImageItem>, DataError> {
    let src = table.require("图片")?;
    let caption = table.require("标题")?;
    Ok((0..table.len())
        .filter(|&r| !table.cell(r, src).is_empty())
        .map(|r| ImageItem {
            src: table.cell(r, src).to_string(),
            caption: table.cell(r, caption).trim().to_string(),
        })
        .collect())
}

impl DataLoader for CnNewsLoader {
    fn name(&self) -> &'static str {
        "CnNewsLoader"
    }

    fn fetch(&self, source_id: &str) -> Result<Table, DataError> {
        self.ctx
            .cached(source_id, Granularity::Daily, self.provider.as_ref(), "")
    }

    fn clean(&self, source_id: &str) -> Result<Dataset, DataError> {
        Ok(Dataset::Images(parse_images(&self.fetch(source_id)?)?))
    }
}

pub struct CnNewsBuilder {
    date: NaiveDate,
}

impl CnNewsBuilder {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

impl SlidesBuilder for CnNewsBuilder {
    fn name(&self) -> &'static str {
        "CnNewsBuilder"
    }

    fn build(&self, data: Dataset) -> Result<SlideSet, BuildError> {
        warn_if_empty(self.name(), &data);
        let images = match data {
            Dataset::Images(i) => i,
            other => return Err(unexpected(self.name(), "images", &other)),
        };

        let mut set = SlideSet::default();
        set.push(Deck::cover("图片新闻", self.date.format("%Y-%m-%d").to_string()));
        for item in images {
            set.push(Deck::new(DeckContent::Images(vec![ImageRef {
                src: item.src,
                caption: item.caption,
            }])));
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::chinanews::IMAGE_COLUMNS;

    #[test]
    fn rows_without_src_are_dropped() {
        let t = Table::with_rows(
            IMAGE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            vec![
                vec!["1".into(), "https://img/a.jpg".into(), " 秋色 ".into()],
                vec!["2".into(), "".into(), "无图".into()],
            ],
        );
        let items = parse_images(&t).unwrap();
        assert_eq!(items, vec![ImageItem { src: "https://img/a.jpg".into(), caption: "秋色".into() }]);
    }

    #[test]
    fn cover_then_one_deck_per_image() {
        let images = vec![
            ImageItem { src: "a.jpg".into(), caption: "A".into() },
            ImageItem { src: "b.jpg".into(), caption: "B".into() },
        ];
        let set = CnNewsBuilder::new(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap())
            .build(Dataset::Images(images))
            .unwrap();
        assert_eq!(set.decks.len(), 3);
        assert_eq!(set.decks[0].title.as_deref(), Some("图片新闻"));
        assert_eq!(set.decks[2].item_count(), 1);
        assert_eq!(set.decks[2].kind().template_name(), "img");
    }
}
