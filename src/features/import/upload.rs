//! Bulk term import. One term per line, tab-separated:
//! term, translation, romanization, status, tags (comma-separated).
//! Only the term column is required; blank lines and # comments are skipped.

use crate::features::review;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedTerm {
    pub term: String,
    pub translation: String,
    pub romanization: String,
    pub status: i32,
    pub tags: Vec<String>,
}

pub fn parse_upload(content: &str) -> Vec<UploadedTerm> {
    let mut terms = Vec::new();

    for line in content.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split('\t');
        let term = match fields.next().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => continue,
        };
        let translation = fields.next().map(str::trim).unwrap_or("").to_string();
        let romanization = fields.next().map(str::trim).unwrap_or("").to_string();
        let status = fields
            .next()
            .and_then(|s| s.trim().parse().ok())
            .filter(|s| review::is_valid_status(*s))
            .unwrap_or(1);
        let tags = fields
            .next()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        terms.push(UploadedTerm {
            term,
            translation,
            romanization,
            status,
            tags,
        });
    }
    terms
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_full_lines() {
        let content = "Haus\thouse\t\t3\tnoun,basics\nlaufen\tto run\t\t1\tverb\n";
        let terms = parse_upload(content);
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].term, "Haus");
        assert_eq!(terms[0].translation, "house");
        assert_eq!(terms[0].status, 3);
        assert_eq!(terms[0].tags, vec!["noun", "basics"]);
    }

    #[test]
    fn term_only_lines_get_defaults() {
        let terms = parse_upload("Haus\n");
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].translation, "");
        assert_eq!(terms[0].status, 1);
        assert!(terms[0].tags.is_empty());
    }

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let terms = parse_upload("# vocabulary\n\n  \nHaus\thouse\n");
        assert_eq!(terms.len(), 1);
    }

    #[test]
    fn invalid_status_falls_back_to_one() {
        let terms = parse_upload("Haus\thouse\t\t7\nBaum\ttree\t\tabc\n");
        assert_eq!(terms[0].status, 1);
        assert_eq!(terms[1].status, 1);
    }

    #[test]
    fn sentinel_statuses_are_accepted() {
        let terms = parse_upload("der\tthe\t\t99\n");
        assert_eq!(terms[0].status, 99);
    }

    #[test]
    fn lines_without_a_term_are_skipped() {
        let terms = parse_upload("\thouse\nHaus\thouse\n");
        assert_eq!(terms.len(), 1);
    }
}
