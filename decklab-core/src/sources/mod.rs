//! One module per data source, each pairing a [`DataLoader`] with a
//! [`SlidesBuilder`].
//!
//! [`DataLoader`]: crate::data::DataLoader
//! [`SlidesBuilder`]: crate::slides::SlidesBuilder

pub mod cidx399317;
pub mod cn_news;
pub mod em_news;
pub mod spot_em;
pub mod sw_indu;
pub mod watchlist;

pub use cidx399317::{Cidx399317Builder, Cidx399317Loader};
pub use cn_news::{CnNewsBuilder, CnNewsLoader};
pub use em_news::{EmNewsBuilder, EmNewsLoader};
pub use spot_em::{SpotEmBuilder, SpotEmLoader};
pub use sw_indu::{SwInduBuilder, SwInduLoader};
pub use watchlist::{WatchlistBuilder, WatchlistLoader};
