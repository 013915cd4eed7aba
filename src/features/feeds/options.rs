//! Feed option strings: comma-separated key=value pairs stored on the feed
//! row, e.g. "autoupdate=2h,max_links=20". Unknown keys are ignored and
//! malformed items are skipped.

use chrono::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleSource {
    /// Article body comes from the feed item's description.
    #[default]
    Description,
    /// Article body is fetched from the item's link.
    Link,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedOptions {
    pub autoupdate: Option<Duration>,
    pub max_links: Option<usize>,
    pub article_source: ArticleSource,
    pub charset: Option<String>,
}

impl FeedOptions {
    pub fn parse(s: &str) -> FeedOptions {
        let mut options = FeedOptions::default();
        for item in s.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let Some((key, value)) = item.split_once('=') else {
                continue;
            };
            match (key.trim(), value.trim()) {
                ("autoupdate", value) => options.autoupdate = parse_duration(value),
                ("max_links", value) => options.max_links = value.parse().ok().filter(|n| *n > 0),
                ("article_source", "link") => options.article_source = ArticleSource::Link,
                ("article_source", "description") => {
                    options.article_source = ArticleSource::Description
                }
                ("charset", value) if !value.is_empty() => {
                    options.charset = Some(value.to_string())
                }
                _ => {}
            }
        }
        options
    }

    /// Canonical string form, parseable back into an equal value.
    pub fn to_option_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(interval) = self.autoupdate {
            parts.push(format!("autoupdate={}", format_duration(interval)));
        }
        if let Some(max_links) = self.max_links {
            parts.push(format!("max_links={}", max_links));
        }
        if self.article_source == ArticleSource::Link {
            parts.push("article_source=link".to_string());
        }
        if let Some(charset) = &self.charset {
            parts.push(format!("charset={}", charset));
        }
        parts.join(",")
    }
}

/// "2h", "30m", "1d"; anything else is None.
fn parse_duration(s: &str) -> Option<Duration> {
    let mut chars = s.chars();
    let unit = chars.next_back()?;
    let amount: i64 = chars.as_str().parse().ok().filter(|n| *n > 0)?;
    match unit {
        'm' => Some(Duration::minutes(amount)),
        'h' => Some(Duration::hours(amount)),
        'd' => Some(Duration::days(amount)),
        _ => None,
    }
}

fn format_duration(d: Duration) -> String {
    let minutes = d.num_minutes();
    if minutes % (24 * 60) == 0 {
        format!("{}d", minutes / (24 * 60))
    } else if minutes % 60 == 0 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_known_keys() {
        let options = FeedOptions::parse("autoupdate=2h,max_links=20,article_source=link");
        assert_eq!(options.autoupdate, Some(Duration::hours(2)));
        assert_eq!(options.max_links, Some(20));
        assert_eq!(options.article_source, ArticleSource::Link);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let options = FeedOptions::parse("frobnicate=yes,autoupdate=1d");
        assert_eq!(options.autoupdate, Some(Duration::days(1)));
    }

    #[test]
    fn malformed_items_are_skipped() {
        let options = FeedOptions::parse("autoupdate,=,max_links=-3,autoupdate=2x, ,charset=");
        assert_eq!(options, FeedOptions::default());
    }

    #[test]
    fn whitespace_around_items_is_tolerated() {
        let options = FeedOptions::parse(" autoupdate = 30m , max_links = 5 ");
        assert_eq!(options.autoupdate, Some(Duration::minutes(30)));
        assert_eq!(options.max_links, Some(5));
    }

    #[test]
    fn empty_string_is_all_defaults() {
        assert_eq!(FeedOptions::parse(""), FeedOptions::default());
    }

    #[test]
    fn round_trips_through_canonical_form() {
        let original = FeedOptions {
            autoupdate: Some(Duration::hours(12)),
            max_links: Some(40),
            article_source: ArticleSource::Link,
            charset: Some("ISO-8859-1".to_string()),
        };
        assert_eq!(FeedOptions::parse(&original.to_option_string()), original);
    }

    #[test]
    fn duration_units() {
        assert_eq!(
            FeedOptions::parse("autoupdate=45m").autoupdate,
            Some(Duration::minutes(45))
        );
        assert_eq!(
            FeedOptions::parse("autoupdate=3d").autoupdate,
            Some(Duration::days(3))
        );
        assert_eq!(FeedOptions::parse("autoupdate=0h").autoupdate, None);
    }
}
