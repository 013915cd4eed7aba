//! Plain-text extraction from fetched article pages. The feed's section tag
//! list restricts extraction to those elements; the filter tag list (plus
//! script/style/noscript, always) removes unwanted subtrees.

use lazy_static::lazy_static;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Splits a stored tag list ("article, div.main" style input is not
/// supported; names only) into lowercased element names.
pub fn parse_tag_list(s: &str) -> Vec<String> {
    s.split([',', ';', ' '])
        .map(|t| t.trim().trim_start_matches('<').trim_end_matches('>').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn always_filtered(name: &str) -> bool {
    matches!(name, "script" | "style" | "noscript" | "head")
}

/// Walks the markup and collects text. With an empty section list the whole
/// document body counts; real-world pages are tag soup, so parse errors end
/// the walk instead of failing the import.
pub fn extract_text(html: &str, section_tags: &[String], filter_tags: &[String]) -> String {
    let mut reader = Reader::from_reader(html.as_bytes());
    reader.trim_text(true);
    reader.check_end_names(false);

    let take_all = section_tags.is_empty();
    let mut section_depth = 0usize;
    let mut filter_depth = 0usize;
    let mut out = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                if always_filtered(&name) || filter_tags.contains(&name) {
                    filter_depth += 1;
                } else if section_tags.contains(&name) {
                    section_depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                if always_filtered(&name) || filter_tags.contains(&name) {
                    filter_depth = filter_depth.saturating_sub(1);
                } else if section_tags.contains(&name) {
                    section_depth = section_depth.saturating_sub(1);
                }
            }
            Ok(Event::Text(e)) => {
                if filter_depth == 0 && (take_all || section_depth > 0) {
                    if let Ok(text) = e.unescape() {
                        out.push_str(&text);
                        out.push(' ');
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if filter_depth == 0 && (take_all || section_depth > 0) {
                    out.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    out.push(' ');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("Stopping article extraction on malformed markup: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    WHITESPACE_RE.replace_all(out.trim(), " ").to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    const PAGE: &str = "<html><head><title>t</title><style>p{}</style></head>\
<body><nav>Menu</nav><article><h1>Headline</h1>\
<p>First paragraph.</p><script>var x = 1;</script>\
<p>Second &amp; last.</p></article><footer>Imprint</footer></body></html>";

    #[test]
    fn section_tags_restrict_extraction() {
        let text = extract_text(PAGE, &["article".to_string()], &[]);
        assert_eq!(text, "Headline First paragraph. Second & last.");
    }

    #[test]
    fn empty_section_list_takes_the_whole_body() {
        let text = extract_text(PAGE, &[], &[]);
        assert!(text.contains("Menu"));
        assert!(text.contains("Imprint"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("p{}"));
    }

    #[test]
    fn filter_tags_remove_subtrees() {
        let text = extract_text(PAGE, &["article".to_string()], &["h1".to_string()]);
        assert_eq!(text, "First paragraph. Second & last.");
    }

    #[test]
    fn tag_list_parsing() {
        assert_eq!(parse_tag_list("article, <p>; div"), vec!["article", "p", "div"]);
        assert!(parse_tag_list("  ").is_empty());
    }
}
