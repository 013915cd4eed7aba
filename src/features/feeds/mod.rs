pub mod extract;
pub mod options;
pub mod parser;

pub use extract::{extract_text, parse_tag_list};
pub use options::{ArticleSource, FeedOptions};
pub use parser::{parse_feed, FeedItem};
