//! Long-text import pipeline: normalize line endings, split into paragraphs,
//! split paragraphs into sentences with the language's tokenizer, then group
//! consecutive sentences into bounded-size chunks. One chunk becomes one text.
//!
//! Single linear pass; concatenating the sentences of every chunk reproduces
//! the sentence sequence of the input exactly.

use lazy_static::lazy_static;
use regex::Regex;

use crate::features::tokenizer::Tokenizer;

lazy_static! {
    static ref BLANK_LINE_RE: Regex = Regex::new(r"\n[ \t]*\n").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphMode {
    /// Every line break starts a new paragraph.
    SingleNewline,
    /// Paragraphs are separated by blank lines.
    BlankLine,
}

impl ParagraphMode {
    pub fn from_param(value: Option<&str>) -> ParagraphMode {
        match value {
            Some("newline") => ParagraphMode::SingleNewline,
            _ => ParagraphMode::BlankLine,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub max_sentences: usize,
    pub mode: ParagraphMode,
}

/// One output text of the pipeline. Paragraph breaks inside the chunk are
/// kept as newlines in `body`.
#[derive(Debug, Clone)]
pub struct TextChunk {
    pub body: String,
    pub sentences: Vec<String>,
}

pub fn split_long_text(body: &str, tokenizer: &Tokenizer, opts: &SplitOptions) -> Vec<TextChunk> {
    let max_sentences = opts.max_sentences.max(1);
    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");

    let paragraphs: Vec<&str> = match opts.mode {
        ParagraphMode::SingleNewline => normalized.split('\n').collect(),
        ParagraphMode::BlankLine => BLANK_LINE_RE.split(&normalized).collect(),
    };

    let mut chunks: Vec<TextChunk> = Vec::new();
    let mut builder = ChunkBuilder::new(tokenizer.joiner());

    for paragraph in paragraphs {
        let collapsed = WHITESPACE_RE.replace_all(paragraph.trim(), " ");
        if collapsed.is_empty() {
            continue;
        }
        for sentence in tokenizer.split_sentences(&collapsed) {
            if builder.len() == max_sentences {
                chunks.push(builder.finish());
            }
            builder.push(sentence);
        }
        builder.end_paragraph();
    }
    if builder.len() > 0 {
        chunks.push(builder.finish());
    }
    chunks
}

struct ChunkBuilder {
    joiner: &'static str,
    paragraphs: Vec<Vec<String>>,
    count: usize,
}

impl ChunkBuilder {
    fn new(joiner: &'static str) -> Self {
        ChunkBuilder {
            joiner,
            paragraphs: vec![Vec::new()],
            count: 0,
        }
    }

    fn len(&self) -> usize {
        self.count
    }

    fn push(&mut self, sentence: String) {
        self.paragraphs
            .last_mut()
            .expect("builder always holds a paragraph")
            .push(sentence);
        self.count += 1;
    }

    fn end_paragraph(&mut self) {
        if !self.paragraphs.last().map(Vec::is_empty).unwrap_or(true) {
            self.paragraphs.push(Vec::new());
        }
    }

    fn finish(&mut self) -> TextChunk {
        let paragraphs = std::mem::replace(&mut self.paragraphs, vec![Vec::new()]);
        self.count = 0;
        let body = paragraphs
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.join(self.joiner))
            .collect::<Vec<String>>()
            .join("\n");
        let sentences = paragraphs.into_iter().flatten().collect();
        TextChunk { body, sentences }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new("a-zA-Z", ".!?", false, false).unwrap()
    }

    fn opts(max_sentences: usize, mode: ParagraphMode) -> SplitOptions {
        SplitOptions {
            max_sentences,
            mode,
        }
    }

    const SAMPLE: &str =
        "One two. Three four! Five?\n\nSix seven. Eight.\nNine ten. Eleven! Twelve?";

    fn all_sentences(chunks: &[TextChunk]) -> Vec<String> {
        chunks.iter().flat_map(|c| c.sentences.clone()).collect()
    }

    #[test]
    fn no_sentence_lost_or_duplicated() {
        let tok = tokenizer();
        let flattened = SAMPLE.split_whitespace().collect::<Vec<_>>().join(" ");
        let direct = tok.split_sentences(&flattened);
        for max in 1..=10 {
            let chunks = split_long_text(SAMPLE, &tok, &opts(max, ParagraphMode::BlankLine));
            assert_eq!(all_sentences(&chunks), direct, "max_sentences = {max}");
        }
    }

    #[test]
    fn chunks_respect_the_bound() {
        let tok = tokenizer();
        for max in 1..=5 {
            let chunks = split_long_text(SAMPLE, &tok, &opts(max, ParagraphMode::BlankLine));
            assert!(chunks.iter().all(|c| c.sentences.len() <= max));
            assert!(chunks.iter().all(|c| !c.sentences.is_empty()));
        }
    }

    #[test]
    fn bound_larger_than_input_yields_one_chunk() {
        let tok = tokenizer();
        let chunks = split_long_text(SAMPLE, &tok, &opts(100, ParagraphMode::BlankLine));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].sentences.len(), 8);
    }

    #[test]
    fn paragraph_breaks_survive_inside_chunks() {
        let tok = tokenizer();
        let chunks = split_long_text(SAMPLE, &tok, &opts(100, ParagraphMode::BlankLine));
        assert_eq!(chunks[0].body.matches('\n').count(), 1);
        assert!(chunks[0].body.starts_with("One two. Three four! Five?"));
    }

    #[test]
    fn single_newline_mode_splits_every_line() {
        let tok = tokenizer();
        let chunks = split_long_text(SAMPLE, &tok, &opts(100, ParagraphMode::SingleNewline));
        assert_eq!(chunks[0].body.matches('\n').count(), 2);
    }

    #[test]
    fn normalizes_crlf_endings() {
        let tok = tokenizer();
        let chunks = split_long_text(
            "One.\r\n\r\nTwo.",
            &tok,
            &opts(100, ParagraphMode::BlankLine),
        );
        assert_eq!(all_sentences(&chunks), &["One.", "Two."]);
        assert_eq!(chunks[0].body, "One.\nTwo.");
    }

    #[test]
    fn whitespace_runs_are_collapsed() {
        let tok = tokenizer();
        let chunks = split_long_text(
            "One   two.\tThree.",
            &tok,
            &opts(100, ParagraphMode::BlankLine),
        );
        assert_eq!(all_sentences(&chunks), &["One two.", "Three."]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let tok = tokenizer();
        assert!(split_long_text("", &tok, &opts(10, ParagraphMode::BlankLine)).is_empty());
        assert!(split_long_text("\n\n \n", &tok, &opts(10, ParagraphMode::BlankLine)).is_empty());
    }

    #[test]
    fn zero_bound_is_treated_as_one() {
        let tok = tokenizer();
        let chunks = split_long_text("A. B.", &tok, &opts(0, ParagraphMode::BlankLine));
        assert_eq!(chunks.len(), 2);
    }
}
