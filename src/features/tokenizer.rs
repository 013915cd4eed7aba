//! Language-aware sentence splitting and tokenization. Each language supplies
//! two regex character classes: sentence-ending characters and word characters.

use regex::Regex;

use crate::data::models::Language;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    /// Byte offset of the token in the sentence it came from.
    pub start: usize,
    pub is_word: bool,
}

pub struct Tokenizer {
    word_re: Regex,
    split_re: Regex,
    split_each_char: bool,
    remove_spaces: bool,
}

impl Tokenizer {
    /// Compiles the language's character classes. A malformed class is a
    /// validation error at language save time, so this is the one place the
    /// user-supplied patterns are trusted to compile.
    pub fn new(
        word_chars: &str,
        sentence_split: &str,
        split_each_char: bool,
        remove_spaces: bool,
    ) -> Result<Self, regex::Error> {
        let word_re = Regex::new(&format!("[{}]", word_chars))?;
        let split_re = Regex::new(&format!("[{}]", sentence_split))?;
        Ok(Tokenizer {
            word_re,
            split_re,
            split_each_char,
            remove_spaces,
        })
    }

    pub fn for_language(lang: &Language) -> Result<Self, regex::Error> {
        Tokenizer::new(
            &lang.word_chars,
            &lang.sentence_split,
            lang.split_each_char,
            lang.remove_spaces,
        )
    }

    /// " " for space-delimited languages, "" for remove-spaces ones; used when
    /// sentences are joined back into a text body.
    pub fn joiner(&self) -> &'static str {
        if self.remove_spaces { "" } else { " " }
    }

    fn is_word_char(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.word_re.is_match(c.encode_utf8(&mut buf))
    }

    fn is_split_char(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.split_re.is_match(c.encode_utf8(&mut buf))
    }

    /// Splits a paragraph into sentences. A sentence ends after a run of
    /// sentence-split characters; the delimiter stays with its sentence.
    pub fn split_sentences(&self, paragraph: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut at_end = false;

        for c in paragraph.chars() {
            if at_end && !self.is_split_char(c) && !c.is_whitespace() {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                current.clear();
                at_end = false;
            }
            current.push(c);
            if self.is_split_char(c) {
                at_end = true;
            }
        }
        let sentence = current.trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        sentences
    }

    /// Splits a sentence into word and non-word tokens. Word tokens are maximal
    /// runs of word characters, or single characters for split-each-char
    /// languages; everything in between becomes non-word tokens. Remove-spaces
    /// languages drop whitespace-only tokens entirely.
    pub fn tokenize(&self, sentence: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut current_start = 0;
        let mut current_is_word = None;

        let mut flush =
            |tokens: &mut Vec<Token>, text: &mut String, start: usize, is_word: Option<bool>| {
                if let Some(is_word) = is_word {
                    if !text.is_empty() {
                        tokens.push(Token {
                            text: std::mem::take(text),
                            start,
                            is_word,
                        });
                    }
                }
            };

        for (idx, c) in sentence.char_indices() {
            let is_word = self.is_word_char(c);
            if self.split_each_char && is_word {
                flush(&mut tokens, &mut current, current_start, current_is_word);
                current_is_word = None;
                tokens.push(Token {
                    text: c.to_string(),
                    start: idx,
                    is_word: true,
                });
                continue;
            }
            match current_is_word {
                Some(k) if k == is_word => current.push(c),
                _ => {
                    flush(&mut tokens, &mut current, current_start, current_is_word);
                    current_start = idx;
                    current.push(c);
                    current_is_word = Some(is_word);
                }
            }
        }
        flush(&mut tokens, &mut current, current_start, current_is_word);

        if self.remove_spaces {
            tokens.retain(|t| t.is_word || !t.text.trim().is_empty());
        }
        tokens
    }

    /// Number of word tokens in a term's text; >1 marks a multi-word expression.
    pub fn word_count(&self, term: &str) -> i32 {
        self.tokenize(term).iter().filter(|t| t.is_word).count() as i32
    }

    /// Lowercased concatenation of the tokens plus each token's byte offset
    /// in it. Lowercasing per token keeps the offsets mappable back to token
    /// ordinals even when a character changes length in lowercase.
    pub fn lowercase_map(&self, tokens: &[Token]) -> (String, Vec<usize>) {
        let mut joined = String::new();
        let mut starts = Vec::with_capacity(tokens.len());
        for token in tokens {
            starts.push(joined.len());
            joined.push_str(&token.text.to_lowercase());
        }
        (joined, starts)
    }

    /// Byte offsets where `needle_lc` occurs in `haystack_lc` on word
    /// boundaries. Both arguments must already be lowercased. Used to place
    /// multi-word expression items at the position of their first word.
    pub fn find_occurrences(&self, haystack_lc: &str, needle_lc: &str) -> Vec<usize> {
        if needle_lc.is_empty() {
            return Vec::new();
        }
        let mut offsets = Vec::new();
        for (start, matched) in haystack_lc.match_indices(needle_lc) {
            if self.split_each_char {
                offsets.push(start);
                continue;
            }
            let before_ok = haystack_lc[..start]
                .chars()
                .next_back()
                .map(|c| !self.is_word_char(c))
                .unwrap_or(true);
            let after_ok = haystack_lc[start + matched.len()..]
                .chars()
                .next()
                .map(|c| !self.is_word_char(c))
                .unwrap_or(true);
            if before_ok && after_ok {
                offsets.push(start);
            }
        }
        offsets
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn english() -> Tokenizer {
        Tokenizer::new("a-zA-Z'", ".!?:;", false, false).unwrap()
    }

    fn japanese() -> Tokenizer {
        Tokenizer::new("\\p{Han}\\p{Hiragana}\\p{Katakana}", "。！？.!?", true, true).unwrap()
    }

    #[test]
    fn splits_plain_sentences() {
        let tok = english();
        let sentences = tok.split_sentences("Hello there. How are you? Fine.");
        assert_eq!(sentences, &["Hello there.", "How are you?", "Fine."]);
    }

    #[test]
    fn delimiter_runs_stay_with_sentence() {
        let tok = english();
        let sentences = tok.split_sentences("Wait... what?! Nothing");
        assert_eq!(sentences, &["Wait...", "what?!", "Nothing"]);
    }

    #[test]
    fn tokenizes_words_and_punctuation() {
        let tok = english();
        let tokens = tok.tokenize("Don't stop, ever.");
        let words: Vec<&str> = tokens
            .iter()
            .filter(|t| t.is_word)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(words, &["Don't", "stop", "ever"]);
        assert_eq!(tokens[1].text, " ");
        assert!(!tokens[1].is_word);
    }

    #[test]
    fn token_offsets_match_source() {
        let tok = english();
        let sentence = "héllo wörld";
        for token in tok.tokenize(sentence) {
            assert_eq!(&sentence[token.start..token.start + token.text.len()], token.text);
        }
    }

    #[test]
    fn split_each_char_emits_single_characters() {
        let tok = japanese();
        let tokens = tok.tokenize("日本語です。");
        let words: Vec<&str> = tokens
            .iter()
            .filter(|t| t.is_word)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(words, &["日", "本", "語", "で", "す"]);
    }

    #[test]
    fn remove_spaces_drops_whitespace_tokens() {
        let tok = japanese();
        let tokens = tok.tokenize("日本 語");
        assert!(tokens.iter().all(|t| !t.text.trim().is_empty()));
    }

    #[test]
    fn word_count_counts_words_only() {
        let tok = english();
        assert_eq!(tok.word_count("of course"), 2);
        assert_eq!(tok.word_count("in spite of"), 3);
        assert_eq!(tok.word_count("hello!"), 1);
    }

    #[test]
    fn occurrences_respect_word_boundaries() {
        let tok = english();
        let haystack = "the cat scattered; the cat sat";
        let offsets = tok.find_occurrences(haystack, "cat");
        assert_eq!(offsets, vec![4, 23]);
    }

    #[test]
    fn multi_word_occurrence_found() {
        let tok = english();
        let haystack = "all of course at once, of course";
        assert_eq!(tok.find_occurrences(haystack, "of course").len(), 2);
    }

    #[test]
    fn bad_character_class_is_an_error() {
        assert!(Tokenizer::new("z-a", ".!?", false, false).is_err());
    }
}
