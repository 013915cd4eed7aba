use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::data::models::{
    AppError, Language, NewSentence, NewText, NewTextItem, NewWord, ReadingToken, Text,
    TextListEntry, TextQuery,
};
use crate::data::repositories::{
    compile_tokenizer, last_insert_rowid, LanguageRepository, WordRepository,
};
use crate::features::review::STATUS_WELL_KNOWN;
use crate::features::splitter::{split_long_text, SplitOptions};
use crate::features::tokenizer::Tokenizer;
use crate::schema::{feed_articles, languages, sentences, text_items, texts, words};

pub struct TextRepository;

impl TextRepository {
    pub fn list(
        conn: &mut SqliteConnection,
        query: &TextQuery,
        per_page: i64,
    ) -> Result<(Vec<TextListEntry>, i64), AppError> {
        let mut rows_query = texts::table
            .inner_join(languages::table)
            .select((
                texts::text_id,
                texts::title,
                languages::lang_name,
                texts::archived,
                texts::created_at,
            ))
            .into_boxed();
        let mut count_query = texts::table
            .inner_join(languages::table)
            .select(diesel::dsl::count_star())
            .into_boxed();

        rows_query = rows_query.filter(texts::archived.eq(query.archived));
        count_query = count_query.filter(texts::archived.eq(query.archived));
        if let Some(lang_id) = query.lang {
            rows_query = rows_query.filter(texts::lang_id.eq(lang_id));
            count_query = count_query.filter(texts::lang_id.eq(lang_id));
        }
        if let Some(pattern) = query.query.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = format!("%{}%", pattern.trim());
            rows_query = rows_query.filter(texts::title.like(pattern.clone()));
            count_query = count_query.filter(texts::title.like(pattern));
        }

        let total = count_query.first::<i64>(conn)?;
        let page = query.page.unwrap_or(1).max(1);
        let rows = rows_query
            .order_by(texts::created_at.desc())
            .limit(per_page)
            .offset((page - 1) * per_page)
            .load::<(i32, String, String, bool, NaiveDateTime)>(conn)?
            .into_iter()
            .map(|(text_id, title, lang_name, archived, created_at)| TextListEntry {
                text_id,
                title,
                lang_name,
                archived,
                created_at,
            })
            .collect();

        Ok((rows, total))
    }

    pub fn find(conn: &mut SqliteConnection, text_id: i32) -> Result<Text, AppError> {
        texts::table
            .filter(texts::text_id.eq(text_id))
            .select(Text::as_select())
            .first(conn)
            .optional()?
            .ok_or(AppError::NotFound("Text"))
    }

    /// Inserts a text and runs the tokenization maintenance for it.
    pub fn create_parsed(
        conn: &mut SqliteConnection,
        lang: &Language,
        title: &str,
        body: &str,
        source_uri: Option<&str>,
    ) -> Result<i32, AppError> {
        let tokenizer = compile_tokenizer(lang)?;
        let multiwords = WordRepository::multiword_terms(conn, lang.lang_id)?;
        conn.transaction::<_, AppError, _>(|conn| {
            let text_id = Self::insert_row(conn, lang.lang_id, title, body, source_uri)?;
            Self::store_parse(conn, text_id, body, &tokenizer, &multiwords)?;
            Ok(text_id)
        })
    }

    pub fn update_parsed(
        conn: &mut SqliteConnection,
        text_id: i32,
        lang: &Language,
        title: &str,
        body: &str,
        source_uri: Option<&str>,
    ) -> Result<(), AppError> {
        let tokenizer = compile_tokenizer(lang)?;
        let multiwords = WordRepository::multiword_terms(conn, lang.lang_id)?;
        conn.transaction::<_, AppError, _>(|conn| {
            let updated = diesel::update(texts::table.filter(texts::text_id.eq(text_id)))
                .set((
                    texts::lang_id.eq(lang.lang_id),
                    texts::title.eq(title),
                    texts::body.eq(body),
                    texts::source_uri.eq(source_uri),
                    texts::annotated.eq(""),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(AppError::NotFound("Text"));
            }
            Self::store_parse(conn, text_id, body, &tokenizer, &multiwords)?;
            Ok(())
        })
    }

    /// Re-runs sentence/item generation from the stored body, e.g. after the
    /// language's character classes changed.
    pub fn reparse(conn: &mut SqliteConnection, text_id: i32) -> Result<(), AppError> {
        let text = Self::find(conn, text_id)?;
        let lang = LanguageRepository::find(conn, text.lang_id)?;
        let tokenizer = compile_tokenizer(&lang)?;
        let multiwords = WordRepository::multiword_terms(conn, lang.lang_id)?;
        conn.transaction::<_, AppError, _>(|conn| {
            Self::store_parse(conn, text_id, &text.body, &tokenizer, &multiwords)
        })
    }

    /// The long-text import pipeline: split into bounded chunks, persist each
    /// chunk as a text of its own, numbered "title (i/n)".
    pub fn import_long(
        conn: &mut SqliteConnection,
        lang: &Language,
        title: &str,
        body: &str,
        opts: &SplitOptions,
    ) -> Result<Vec<i32>, AppError> {
        let tokenizer = compile_tokenizer(lang)?;
        let chunks = split_long_text(body, &tokenizer, opts);
        if chunks.is_empty() {
            return Err(AppError::Validation("Text is not set!".to_string()));
        }
        let multiwords = WordRepository::multiword_terms(conn, lang.lang_id)?;

        conn.transaction::<_, AppError, _>(|conn| {
            let total = chunks.len();
            let mut ids = Vec::with_capacity(total);
            for (i, chunk) in chunks.iter().enumerate() {
                let chunk_title = format!("{} ({}/{})", title, i + 1, total);
                let text_id =
                    Self::insert_row(conn, lang.lang_id, &chunk_title, &chunk.body, None)?;
                Self::store_parse(conn, text_id, &chunk.body, &tokenizer, &multiwords)?;
                ids.push(text_id);
            }
            Ok(ids)
        })
    }

    pub fn delete(conn: &mut SqliteConnection, text_id: i32) -> Result<(), AppError> {
        conn.transaction::<_, AppError, _>(|conn| {
            diesel::delete(text_items::table.filter(text_items::text_id.eq(text_id)))
                .execute(conn)?;
            diesel::delete(sentences::table.filter(sentences::text_id.eq(text_id)))
                .execute(conn)?;
            diesel::update(feed_articles::table.filter(feed_articles::text_id.eq(text_id)))
                .set(feed_articles::text_id.eq(None::<i32>))
                .execute(conn)?;
            let deleted = diesel::delete(texts::table.filter(texts::text_id.eq(text_id)))
                .execute(conn)?;
            if deleted == 0 {
                return Err(AppError::NotFound("Text"));
            }
            Ok(())
        })
    }

    pub fn set_archived(
        conn: &mut SqliteConnection,
        text_id: i32,
        archived: bool,
    ) -> Result<(), AppError> {
        let updated = diesel::update(texts::table.filter(texts::text_id.eq(text_id)))
            .set(texts::archived.eq(archived))
            .execute(conn)?;
        if updated == 0 {
            return Err(AppError::NotFound("Text"));
        }
        Ok(())
    }

    /// Tokens of the text grouped per sentence, each word token joined with
    /// the matching term so the template can color it by status.
    pub fn reading_view(
        conn: &mut SqliteConnection,
        text_id: i32,
    ) -> Result<Vec<Vec<ReadingToken>>, AppError> {
        let text = Self::find(conn, text_id)?;
        let items = text_items::table
            .filter(text_items::text_id.eq(text_id))
            .filter(text_items::word_count.le(1))
            .order_by(text_items::ordinal.asc())
            .select((
                text_items::sentence_id,
                text_items::token,
                text_items::token_lc,
                text_items::is_word,
            ))
            .load::<(i32, String, String, bool)>(conn)?;

        let terms: HashMap<String, (i32, i32, String, String)> = words::table
            .filter(words::lang_id.eq(text.lang_id))
            .select((
                words::word_lc,
                words::word_id,
                words::status,
                words::translation,
                words::romanization,
            ))
            .load::<(String, i32, i32, String, String)>(conn)?
            .into_iter()
            .map(|(lc, id, status, translation, romanization)| {
                (lc, (id, status, translation, romanization))
            })
            .collect();

        let mut view: Vec<Vec<ReadingToken>> = Vec::new();
        let mut current_sentence = None;
        for (sentence_id, token, token_lc, is_word) in items {
            if current_sentence != Some(sentence_id) {
                view.push(Vec::new());
                current_sentence = Some(sentence_id);
            }
            let term = if is_word { terms.get(&token_lc) } else { None };
            let target = view.last_mut().expect("sentence group just pushed");
            target.push(ReadingToken {
                token,
                is_word,
                word_id: term.map(|t| t.0),
                status: term.map(|t| t.1),
                translation: term.map(|t| t.2.clone()),
                romanization: term.map(|t| t.3.clone()),
            });
        }
        Ok(view)
    }

    /// (unique word tokens, tokens without a term) for the read page header.
    pub fn word_stats(
        conn: &mut SqliteConnection,
        text_id: i32,
    ) -> Result<(usize, usize), AppError> {
        let text = Self::find(conn, text_id)?;
        let tokens: Vec<String> = text_items::table
            .filter(text_items::text_id.eq(text_id))
            .filter(text_items::is_word.eq(true))
            .filter(text_items::word_count.eq(1))
            .select(text_items::token_lc)
            .distinct()
            .load(conn)?;
        let known: HashSet<String> = words::table
            .filter(words::lang_id.eq(text.lang_id))
            .select(words::word_lc)
            .load::<String>(conn)?
            .into_iter()
            .collect();
        let unknown = tokens.iter().filter(|t| !known.contains(*t)).count();
        Ok((tokens.len(), unknown))
    }

    /// Creates a well-known term for every word token that has none yet.
    pub fn mark_all_known(conn: &mut SqliteConnection, text_id: i32) -> Result<usize, AppError> {
        let text = Self::find(conn, text_id)?;
        conn.transaction::<_, AppError, _>(|conn| {
            let tokens: Vec<(String, String)> = text_items::table
                .filter(text_items::text_id.eq(text_id))
                .filter(text_items::is_word.eq(true))
                .filter(text_items::word_count.eq(1))
                .order_by(text_items::ordinal.asc())
                .select((text_items::token, text_items::token_lc))
                .load(conn)?;
            let known: HashSet<String> = words::table
                .filter(words::lang_id.eq(text.lang_id))
                .select(words::word_lc)
                .load::<String>(conn)?
                .into_iter()
                .collect();

            let mut seen = HashSet::new();
            let mut created = 0;
            for (token, token_lc) in tokens {
                if known.contains(&token_lc) || !seen.insert(token_lc.clone()) {
                    continue;
                }
                diesel::insert_into(words::table)
                    .values(&NewWord {
                        lang_id: text.lang_id,
                        word: &token,
                        word_lc: &token_lc,
                        status: STATUS_WELL_KNOWN,
                        translation: "",
                        romanization: "",
                        sentence: "",
                        word_count: 1,
                    })
                    .execute(conn)?;
                created += 1;
            }
            Ok(created)
        })
    }

    /// Regenerates the stored annotation: one "token<TAB>translation" line per
    /// word token, in reading order.
    pub fn annotate(conn: &mut SqliteConnection, text_id: i32) -> Result<String, AppError> {
        let text = Self::find(conn, text_id)?;
        let tokens: Vec<(String, String)> = text_items::table
            .filter(text_items::text_id.eq(text_id))
            .filter(text_items::is_word.eq(true))
            .filter(text_items::word_count.eq(1))
            .order_by(text_items::ordinal.asc())
            .select((text_items::token, text_items::token_lc))
            .load(conn)?;
        let translations: HashMap<String, String> = words::table
            .filter(words::lang_id.eq(text.lang_id))
            .select((words::word_lc, words::translation))
            .load::<(String, String)>(conn)?
            .into_iter()
            .collect();

        let mut annotated = String::new();
        for (token, token_lc) in tokens {
            annotated.push_str(&token);
            annotated.push('\t');
            if let Some(translation) = translations.get(&token_lc) {
                annotated.push_str(translation);
            }
            annotated.push('\n');
        }

        diesel::update(texts::table.filter(texts::text_id.eq(text_id)))
            .set(texts::annotated.eq(&annotated))
            .execute(conn)?;
        Ok(annotated)
    }

    pub fn sentences(
        conn: &mut SqliteConnection,
        text_id: i32,
    ) -> Result<Vec<(i32, String)>, AppError> {
        let rows = sentences::table
            .filter(sentences::text_id.eq(text_id))
            .order_by(sentences::ordinal.asc())
            .select((sentences::sentence_id, sentences::content))
            .load(conn)?;
        Ok(rows)
    }

    fn insert_row(
        conn: &mut SqliteConnection,
        lang_id: i32,
        title: &str,
        body: &str,
        source_uri: Option<&str>,
    ) -> Result<i32, AppError> {
        diesel::insert_into(texts::table)
            .values(&NewText {
                lang_id,
                title,
                body,
                source_uri,
            })
            .execute(conn)?;
        Ok(last_insert_rowid(conn)?)
    }

    /// Regenerates sentences and text items for a text body. Multi-word terms
    /// of the language get an extra item at the ordinal of their first word
    /// for every occurrence.
    fn store_parse(
        conn: &mut SqliteConnection,
        text_id: i32,
        body: &str,
        tokenizer: &Tokenizer,
        multiwords: &[(String, i32)],
    ) -> Result<(), AppError> {
        diesel::delete(text_items::table.filter(text_items::text_id.eq(text_id)))
            .execute(conn)?;
        diesel::delete(sentences::table.filter(sentences::text_id.eq(text_id)))
            .execute(conn)?;

        let mut items: Vec<NewTextItem> = Vec::new();
        let mut sentence_ordinal = 0;
        let mut item_ordinal = 0;

        for paragraph in body.split('\n') {
            for sentence in tokenizer.split_sentences(paragraph) {
                diesel::insert_into(sentences::table)
                    .values(&NewSentence {
                        text_id,
                        ordinal: sentence_ordinal,
                        content: &sentence,
                    })
                    .execute(conn)?;
                let sentence_id = last_insert_rowid(conn)?;
                sentence_ordinal += 1;

                let tokens = tokenizer.tokenize(&sentence);
                let (sentence_lc, lc_starts) = tokenizer.lowercase_map(&tokens);

                let base_ordinal = item_ordinal;
                for token in &tokens {
                    items.push(NewTextItem {
                        text_id,
                        sentence_id,
                        ordinal: item_ordinal,
                        word_count: if token.is_word { 1 } else { 0 },
                        token: token.text.clone(),
                        token_lc: token.text.to_lowercase(),
                        is_word: token.is_word,
                    });
                    item_ordinal += 1;
                }

                for (needle, word_count) in multiwords {
                    for offset in tokenizer.find_occurrences(&sentence_lc, needle) {
                        if let Ok(idx) = lc_starts.binary_search(&offset) {
                            items.push(NewTextItem {
                                text_id,
                                sentence_id,
                                ordinal: base_ordinal + idx as i32,
                                word_count: *word_count,
                                token: needle.clone(),
                                token_lc: needle.clone(),
                                is_word: true,
                            });
                        }
                    }
                }
            }
        }

        for chunk in items.chunks(100) {
            diesel::insert_into(text_items::table)
                .values(chunk)
                .execute(conn)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::models::WordForm;
    use crate::data::repositories::test_support::{create_english, test_conn};

    fn word_form(lang_id: i32, word: &str, status: i32) -> WordForm {
        WordForm {
            lang_id,
            word: word.to_string(),
            translation: String::new(),
            romanization: String::new(),
            sentence: String::new(),
            status,
            tags: String::new(),
        }
    }

    fn create_sample(conn: &mut SqliteConnection, lang_id: i32) -> i32 {
        let lang = LanguageRepository::find(conn, lang_id).unwrap();
        TextRepository::create_parsed(
            conn,
            &lang,
            "Sample",
            "It works of course. It really does.",
            None,
        )
        .unwrap()
    }

    #[test]
    fn parsing_creates_sentences_and_items() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let text_id = create_sample(&mut conn, lang_id);

        let sentences = TextRepository::sentences(&mut conn, text_id).unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].1, "It works of course.");

        let view = TextRepository::reading_view(&mut conn, text_id).unwrap();
        assert_eq!(view.len(), 2);
        let words_in_first: Vec<&str> = view[0]
            .iter()
            .filter(|t| t.is_word)
            .map(|t| t.token.as_str())
            .collect();
        assert_eq!(words_in_first, &["It", "works", "of", "course"]);
    }

    #[test]
    fn multiword_terms_get_occurrence_items() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        WordRepository::create(&mut conn, &word_form(lang_id, "of course", 2)).unwrap();
        let text_id = create_sample(&mut conn, lang_id);

        let mwe_rows: i64 = text_items::table
            .filter(text_items::text_id.eq(text_id))
            .filter(text_items::word_count.eq(2))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(mwe_rows, 1);
    }

    #[test]
    fn reading_view_joins_term_statuses() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        WordRepository::create(&mut conn, &word_form(lang_id, "works", 3)).unwrap();
        let text_id = create_sample(&mut conn, lang_id);

        let view = TextRepository::reading_view(&mut conn, text_id).unwrap();
        let works = view[0]
            .iter()
            .find(|t| t.token == "works")
            .expect("token missing");
        assert_eq!(works.status, Some(3));
        let it = view[0].iter().find(|t| t.token == "It").unwrap();
        assert_eq!(it.status, None);
    }

    #[test]
    fn mark_all_known_creates_missing_terms_once() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        WordRepository::create(&mut conn, &word_form(lang_id, "works", 2)).unwrap();
        let text_id = create_sample(&mut conn, lang_id);

        // unique unknown tokens: it, of, course, really, does
        let created = TextRepository::mark_all_known(&mut conn, text_id).unwrap();
        assert_eq!(created, 5);
        assert_eq!(TextRepository::mark_all_known(&mut conn, text_id).unwrap(), 0);

        let (total, unknown) = TextRepository::word_stats(&mut conn, text_id).unwrap();
        assert_eq!(total, 6);
        assert_eq!(unknown, 0);
    }

    #[test]
    fn long_import_persists_numbered_chunks() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let lang = LanguageRepository::find(&mut conn, lang_id).unwrap();
        let body = "One. Two. Three. Four. Five.";
        let ids = TextRepository::import_long(
            &mut conn,
            &lang,
            "Novel",
            body,
            &SplitOptions {
                max_sentences: 2,
                mode: crate::features::splitter::ParagraphMode::BlankLine,
            },
        )
        .unwrap();
        assert_eq!(ids.len(), 3);

        let first = TextRepository::find(&mut conn, ids[0]).unwrap();
        assert_eq!(first.title, "Novel (1/3)");
        assert_eq!(first.body, "One. Two.");
        let last = TextRepository::find(&mut conn, ids[2]).unwrap();
        assert_eq!(last.body, "Five.");
    }

    #[test]
    fn annotation_lists_word_tokens_with_translations() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let mut form = word_form(lang_id, "works", 1);
        form.translation = "funktioniert".to_string();
        WordRepository::create(&mut conn, &form).unwrap();
        let text_id = create_sample(&mut conn, lang_id);

        let annotated = TextRepository::annotate(&mut conn, text_id).unwrap();
        assert!(annotated.contains("works\tfunktioniert\n"));
        assert!(annotated.contains("It\t\n"));

        let text = TextRepository::find(&mut conn, text_id).unwrap();
        assert_eq!(text.annotated, annotated);
    }

    #[test]
    fn delete_removes_sentences_and_items() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let text_id = create_sample(&mut conn, lang_id);

        TextRepository::delete(&mut conn, text_id).unwrap();
        assert!(TextRepository::sentences(&mut conn, text_id).unwrap().is_empty());
        let items: i64 = text_items::table
            .filter(text_items::text_id.eq(text_id))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(items, 0);
        assert!(matches!(
            TextRepository::find(&mut conn, text_id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn reparse_is_idempotent() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let text_id = create_sample(&mut conn, lang_id);

        let before = TextRepository::sentences(&mut conn, text_id).unwrap();
        TextRepository::reparse(&mut conn, text_id).unwrap();
        let after = TextRepository::sentences(&mut conn, text_id).unwrap();
        assert_eq!(
            before.iter().map(|s| &s.1).collect::<Vec<_>>(),
            after.iter().map(|s| &s.1).collect::<Vec<_>>()
        );
    }
}
