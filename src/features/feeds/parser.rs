//! RSS 2.0 / Atom parsing for feed refresh. Pulls title, link, description
//! and publication date out of each item; everything else is skipped.

use chrono::{DateTime, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: Option<NaiveDateTime>,
}

impl FeedItem {
    fn empty() -> FeedItem {
        FeedItem {
            title: String::new(),
            link: String::new(),
            description: String::new(),
            published: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    Description,
    Published,
}

/// Items without a link are dropped; the link is the upsert key.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut field: Option<Field> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    current = Some(FeedItem::empty());
                    field = None;
                }
                b"title" if current.is_some() => field = Some(Field::Title),
                b"link" if current.is_some() => {
                    field = Some(Field::Link);
                    // Atom puts the target in a href attribute
                    if let Some(href) = link_href(&e) {
                        if let Some(item) = &mut current {
                            item.link = href;
                        }
                    }
                }
                b"description" | b"summary" | b"encoded" if current.is_some() => {
                    field = Some(Field::Description)
                }
                b"pubDate" | b"published" | b"updated" if current.is_some() => {
                    field = Some(Field::Published)
                }
                _ => field = None,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"link" {
                    if let Some(href) = link_href(&e) {
                        if let Some(item) = &mut current {
                            item.link = href;
                        }
                    }
                }
            }
            Event::Text(e) => {
                if let (Some(item), Some(field)) = (&mut current, field) {
                    let text = e.unescape()?.into_owned();
                    assign(item, field, &text);
                }
            }
            Event::CData(e) => {
                if let (Some(item), Some(field)) = (&mut current, field) {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    assign(item, field, &text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    if let Some(item) = current.take() {
                        if !item.link.is_empty() {
                            items.push(item);
                        }
                    }
                    field = None;
                }
                _ => field = None,
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(items)
}

fn assign(item: &mut FeedItem, field: Field, text: &str) {
    match field {
        Field::Title => item.title.push_str(text),
        Field::Link => item.link.push_str(text),
        Field::Description => item.description.push_str(text),
        Field::Published => {
            if item.published.is_none() {
                item.published = parse_date(text);
            }
        }
    }
}

fn link_href(e: &BytesStart) -> Option<String> {
    if let Ok(Some(rel)) = e.try_get_attribute("rel") {
        let rel = rel.unescape_value().ok()?;
        if rel != "alternate" {
            return None;
        }
    }
    let href = e.try_get_attribute("href").ok()??;
    Some(href.unescape_value().ok()?.into_owned())
}

fn parse_date(s: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc2822(s)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Die Nachrichten</title>
    <link>https://example.org</link>
    <item>
      <title>Erster Artikel</title>
      <link>https://example.org/1</link>
      <description>Es war einmal &amp; so weiter.</description>
      <pubDate>Tue, 04 Aug 2026 08:30:00 +0200</pubDate>
    </item>
    <item>
      <title>Zweiter Artikel</title>
      <link>https://example.org/2</link>
      <description><![CDATA[Mit <b>Markup</b> im Text.]]></description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Feed</title>
  <entry>
    <title>Atom Entry</title>
    <link rel="alternate" href="https://example.org/atom/1"/>
    <link rel="self" href="https://example.org/feed"/>
    <summary>Short summary.</summary>
    <updated>2026-08-04T06:30:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items() {
        let items = parse_feed(RSS).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Erster Artikel");
        assert_eq!(items[0].link, "https://example.org/1");
        assert_eq!(items[0].description, "Es war einmal & so weiter.");
    }

    #[test]
    fn channel_title_does_not_leak_into_items() {
        let items = parse_feed(RSS).unwrap();
        assert!(items.iter().all(|i| i.title != "Die Nachrichten"));
    }

    #[test]
    fn rfc2822_dates_are_normalized_to_utc() {
        let items = parse_feed(RSS).unwrap();
        let published = items[0].published.unwrap();
        assert_eq!(
            published.date(),
            NaiveDate::from_ymd_opt(2026, 8, 4).unwrap()
        );
        assert_eq!(published.hour(), 6);
    }

    #[test]
    fn cdata_descriptions_are_kept_verbatim() {
        let items = parse_feed(RSS).unwrap();
        assert_eq!(items[1].description, "Mit <b>Markup</b> im Text.");
        assert_eq!(items[1].published, None);
    }

    #[test]
    fn parses_atom_entries_with_link_href() {
        let items = parse_feed(ATOM).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.org/atom/1");
        assert_eq!(items[0].description, "Short summary.");
        assert!(items[0].published.is_some());
    }

    #[test]
    fn items_without_a_link_are_dropped() {
        let xml = r#"<rss><channel><item><title>No link</title></item></channel></rss>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        assert!(parse_feed("<rss><channel></chunnel></rss>").is_err());
    }
}
