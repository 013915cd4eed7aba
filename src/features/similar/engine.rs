use lazy_static::lazy_static;
use regex::Regex;
use unidecode::unidecode;

lazy_static! {
    static ref NORMALIZE_RE: Regex = Regex::new(r"[^a-z0-9]").unwrap();
}

/// Ranks existing terms of a language by similarity to a candidate term,
/// shown as suggestions while creating or editing a term.
pub struct SimilarEngine;

impl SimilarEngine {
    /// Returns (word_id, score) pairs sorted by descending score, cut to
    /// `limit`. Candidates are (word_id, term text) pairs.
    pub fn rank(term: &str, candidates: &[(i32, String)], limit: usize) -> Vec<(i32, f32)> {
        let needle = SimilarEngine::normalize(term);
        if needle.is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();
        for (word_id, candidate) in candidates {
            let score = SimilarEngine::similarity(&needle, &SimilarEngine::normalize(candidate));
            if score > 0.66 {
                results.push((*word_id, score));
            }
        }

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        results
    }

    /// Lowercased, diacritic-stripped, alphanumeric-only form used for
    /// comparison, so "café" and "Cafe" count as the same string.
    fn normalize(s: &str) -> String {
        NORMALIZE_RE
            .replace_all(&unidecode(s).to_lowercase(), "")
            .to_string()
    }

    fn similarity(a: &str, b: &str) -> f32 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        if a == b {
            return 1.0;
        }

        // Check for partial matches with higher weight
        if b.contains(a) {
            let ratio = a.len() as f32 / b.len() as f32;
            return 0.6 + (ratio * 0.4);
        }

        // Check for reverse partial match
        if a.contains(b) {
            let ratio = b.len() as f32 / a.len() as f32;
            return 0.5 + (ratio * 0.3);
        }

        strsim::jaro_winkler(a, b) as f32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn candidates() -> Vec<(i32, String)> {
        vec![
            (1, "haus".to_string()),
            (2, "hausaufgabe".to_string()),
            (3, "maus".to_string()),
            (4, "zeitung".to_string()),
        ]
    }

    #[test]
    fn exact_match_ranks_first() {
        let ranked = SimilarEngine::rank("Haus", &candidates(), 5);
        assert_eq!(ranked.first().map(|r| r.0), Some(1));
        assert_eq!(ranked.first().map(|r| r.1), Some(1.0));
    }

    #[test]
    fn diacritics_are_ignored() {
        let cands = vec![(7, "café".to_string())];
        let ranked = SimilarEngine::rank("cafe", &cands, 5);
        assert_eq!(ranked.first().map(|r| r.0), Some(7));
        assert_eq!(ranked.first().map(|r| r.1), Some(1.0));
    }

    #[test]
    fn unrelated_terms_are_cut() {
        let ranked = SimilarEngine::rank("haus", &candidates(), 5);
        assert!(!ranked.iter().any(|r| r.0 == 4));
    }

    #[test]
    fn limit_is_applied() {
        let ranked = SimilarEngine::rank("haus", &candidates(), 1);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn blank_needle_matches_nothing() {
        assert!(SimilarEngine::rank("  ", &candidates(), 5).is_empty());
    }
}
