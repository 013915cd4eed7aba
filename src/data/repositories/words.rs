use std::collections::HashMap;

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::data::models::{AppError, NewTextItem, NewWord, Tag, Word, WordForm, WordQuery};
use crate::data::repositories::{
    compile_tokenizer, last_insert_rowid, LanguageRepository, TagRepository,
};
use crate::features::import::UploadedTerm;
use crate::features::review::{self, Answer, ReviewEngine};
use crate::features::similar::SimilarEngine;
use crate::features::tokenizer::Tokenizer;
use crate::schema::{sentences, tags, text_items, texts, word_tags, words};

/// Multi-word expressions are matched against texts up to this length.
const MAX_EXPRESSION_WORDS: i32 = 9;

pub struct WordRepository;

impl WordRepository {
    pub fn list(
        conn: &mut SqliteConnection,
        query: &WordQuery,
        per_page: i64,
    ) -> Result<(Vec<Word>, i64), AppError> {
        let mut rows_query = words::table.select(Word::as_select()).into_boxed();
        let mut count_query = words::table
            .select(diesel::dsl::count_star())
            .into_boxed();

        if let Some(lang_id) = query.lang {
            rows_query = rows_query.filter(words::lang_id.eq(lang_id));
            count_query = count_query.filter(words::lang_id.eq(lang_id));
        }
        if let Some(status) = query.status {
            rows_query = rows_query.filter(words::status.eq(status));
            count_query = count_query.filter(words::status.eq(status));
        }
        if let Some(pattern) = query.query.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = format!("%{}%", pattern.trim().to_lowercase());
            rows_query = rows_query.filter(
                words::word_lc
                    .like(pattern.clone())
                    .or(words::translation.like(pattern.clone())),
            );
            count_query = count_query.filter(
                words::word_lc
                    .like(pattern.clone())
                    .or(words::translation.like(pattern)),
            );
        }
        if let Some(tag_id) = query.tag {
            let tagged = word_tags::table
                .filter(word_tags::tag_id.eq(tag_id))
                .select(word_tags::word_id);
            rows_query = rows_query.filter(words::word_id.eq_any(tagged.clone()));
            count_query = count_query.filter(words::word_id.eq_any(tagged));
        }

        let total = count_query.first::<i64>(conn)?;
        let page = query.page.unwrap_or(1).max(1);
        let rows = rows_query
            .order_by(words::word_lc.asc())
            .limit(per_page)
            .offset((page - 1) * per_page)
            .load(conn)?;

        Ok((rows, total))
    }

    pub fn find(conn: &mut SqliteConnection, word_id: i32) -> Result<Word, AppError> {
        words::table
            .filter(words::word_id.eq(word_id))
            .select(Word::as_select())
            .first(conn)
            .optional()?
            .ok_or(AppError::NotFound("Term"))
    }

    pub fn find_by_text(
        conn: &mut SqliteConnection,
        lang_id: i32,
        word_lc: &str,
    ) -> Result<Option<Word>, AppError> {
        let word = words::table
            .filter(words::lang_id.eq(lang_id))
            .filter(words::word_lc.eq(word_lc))
            .select(Word::as_select())
            .first(conn)
            .optional()?;
        Ok(word)
    }

    /// Creates a term. The same (language, lowercased text) pair twice is a
    /// duplicate error, not a second row.
    pub fn create(conn: &mut SqliteConnection, form: &WordForm) -> Result<i32, AppError> {
        let word = form.word.trim();
        if word.is_empty() {
            return Err(AppError::Validation("Term is not set!".to_string()));
        }
        if !review::is_valid_status(form.status) {
            return Err(AppError::Validation("Invalid status value".to_string()));
        }

        let lang = LanguageRepository::find(conn, form.lang_id)?;
        let tokenizer = compile_tokenizer(&lang)?;
        let word_lc = word.to_lowercase();
        let word_count = tokenizer.word_count(word);
        if word_count > MAX_EXPRESSION_WORDS {
            return Err(AppError::Validation(format!(
                "Expressions are limited to {} words",
                MAX_EXPRESSION_WORDS
            )));
        }

        let inserted = diesel::insert_into(words::table)
            .values(&NewWord {
                lang_id: form.lang_id,
                word,
                word_lc: &word_lc,
                status: form.status,
                translation: form.translation.trim(),
                romanization: form.romanization.trim(),
                sentence: form.sentence.trim(),
                word_count,
            })
            .execute(conn);
        match inserted {
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Err(AppError::Duplicate("term"));
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }
        let word_id = last_insert_rowid(conn)?;

        Self::set_tags(conn, word_id, &form.tags)?;
        if word_count > 1 {
            Self::rescan_multiword(conn, form.lang_id, &word_lc, word_count, &tokenizer)?;
        }
        Ok(word_id)
    }

    /// Updates a term in place; the language is fixed at creation. A changed
    /// status stamps status_changed, and multi-word occurrence items follow
    /// the new text.
    pub fn update(
        conn: &mut SqliteConnection,
        word_id: i32,
        form: &WordForm,
    ) -> Result<(), AppError> {
        let existing = Self::find(conn, word_id)?;
        let word = form.word.trim();
        if word.is_empty() {
            return Err(AppError::Validation("Term is not set!".to_string()));
        }
        if !review::is_valid_status(form.status) {
            return Err(AppError::Validation("Invalid status value".to_string()));
        }

        let lang = LanguageRepository::find(conn, existing.lang_id)?;
        let tokenizer = compile_tokenizer(&lang)?;
        let word_lc = word.to_lowercase();
        let word_count = tokenizer.word_count(word);
        if word_count > MAX_EXPRESSION_WORDS {
            return Err(AppError::Validation(format!(
                "Expressions are limited to {} words",
                MAX_EXPRESSION_WORDS
            )));
        }

        let result = diesel::update(words::table.filter(words::word_id.eq(word_id)))
            .set((
                words::word.eq(word),
                words::word_lc.eq(&word_lc),
                words::status.eq(form.status),
                words::translation.eq(form.translation.trim()),
                words::romanization.eq(form.romanization.trim()),
                words::sentence.eq(form.sentence.trim()),
                words::word_count.eq(word_count),
            ))
            .execute(conn);
        match result {
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Err(AppError::Duplicate("term"));
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }
        if form.status != existing.status {
            diesel::update(words::table.filter(words::word_id.eq(word_id)))
                .set(words::status_changed.eq(chrono::Utc::now().naive_utc()))
                .execute(conn)?;
        }

        Self::set_tags(conn, word_id, &form.tags)?;

        if existing.word_count > 1 && existing.word_lc != word_lc {
            Self::remove_multiword_items(conn, existing.lang_id, &existing.word_lc)?;
        }
        if word_count > 1 {
            Self::rescan_multiword(conn, existing.lang_id, &word_lc, word_count, &tokenizer)?;
        }
        Ok(())
    }

    pub fn delete(conn: &mut SqliteConnection, word_id: i32) -> Result<(), AppError> {
        let word = Self::find(conn, word_id)?;
        conn.transaction::<_, AppError, _>(|conn| {
            diesel::delete(word_tags::table.filter(word_tags::word_id.eq(word_id)))
                .execute(conn)?;
            if word.word_count > 1 {
                Self::remove_multiword_items(conn, word.lang_id, &word.word_lc)?;
            }
            diesel::delete(words::table.filter(words::word_id.eq(word_id))).execute(conn)?;
            Ok(())
        })
    }

    /// Absolute status assignment, including the 98/99 sentinels.
    pub fn set_status(
        conn: &mut SqliteConnection,
        word_id: i32,
        status: i32,
    ) -> Result<i32, AppError> {
        if !review::is_valid_status(status) {
            return Err(AppError::Validation("Invalid status value".to_string()));
        }
        let updated = diesel::update(words::table.filter(words::word_id.eq(word_id)))
            .set((
                words::status.eq(status),
                words::status_changed.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(AppError::NotFound("Term"));
        }
        Ok(status)
    }

    /// Relative status change (+1/-1) through the review engine's clamp.
    pub fn bump_status(
        conn: &mut SqliteConnection,
        word_id: i32,
        delta: i32,
    ) -> Result<i32, AppError> {
        let answer = match delta {
            1 => Answer::Correct,
            -1 => Answer::Incorrect,
            _ => return Err(AppError::Validation("Invalid status delta".to_string())),
        };
        let status = ReviewEngine::new(conn).record_answer(word_id, answer)?;
        Ok(status)
    }

    pub fn tags_for(conn: &mut SqliteConnection, word_id: i32) -> Result<Vec<Tag>, AppError> {
        let rows = word_tags::table
            .inner_join(tags::table)
            .filter(word_tags::word_id.eq(word_id))
            .order_by(tags::tag_name.asc())
            .select(Tag::as_select())
            .load(conn)?;
        Ok(rows)
    }

    /// Replaces the term's tag set with the comma-separated names, creating
    /// missing tags on the fly.
    pub fn set_tags(
        conn: &mut SqliteConnection,
        word_id: i32,
        tag_names: &str,
    ) -> Result<(), AppError> {
        diesel::delete(word_tags::table.filter(word_tags::word_id.eq(word_id))).execute(conn)?;
        for name in tag_names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let tag_id = TagRepository::find_or_create(conn, name)?;
            diesel::insert_into(word_tags::table)
                .values((word_tags::word_id.eq(word_id), word_tags::tag_id.eq(tag_id)))
                .on_conflict((word_tags::word_id, word_tags::tag_id))
                .do_nothing()
                .execute(conn)?;
        }
        Ok(())
    }

    /// Existing terms of the language ranked by similarity to a candidate.
    pub fn similar(
        conn: &mut SqliteConnection,
        lang_id: i32,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Word>, AppError> {
        let candidates: Vec<(i32, String)> = words::table
            .filter(words::lang_id.eq(lang_id))
            .select((words::word_id, words::word))
            .load(conn)?;
        let ranked = SimilarEngine::rank(term, &candidates, limit);
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = ranked.iter().map(|(id, _)| *id).collect();
        let mut by_id: HashMap<i32, Word> = words::table
            .filter(words::word_id.eq_any(&ids))
            .select(Word::as_select())
            .load(conn)?
            .into_iter()
            .map(|w| (w.word_id, w))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Bulk import; duplicates within the language are skipped and counted.
    pub fn bulk_import(
        conn: &mut SqliteConnection,
        lang_id: i32,
        terms: &[UploadedTerm],
    ) -> Result<(usize, usize), AppError> {
        let lang = LanguageRepository::find(conn, lang_id)?;
        let tokenizer = compile_tokenizer(&lang)?;

        conn.transaction::<_, AppError, _>(|conn| {
            let mut imported = 0;
            let mut skipped = 0;
            for term in terms {
                let word = term.term.trim();
                let word_lc = word.to_lowercase();
                let word_count = tokenizer.word_count(word);
                if word_count > MAX_EXPRESSION_WORDS
                    || Self::find_by_text(conn, lang_id, &word_lc)?.is_some()
                {
                    skipped += 1;
                    continue;
                }
                diesel::insert_into(words::table)
                    .values(&NewWord {
                        lang_id,
                        word,
                        word_lc: &word_lc,
                        status: term.status,
                        translation: &term.translation,
                        romanization: &term.romanization,
                        sentence: "",
                        word_count,
                    })
                    .execute(conn)?;
                let word_id = last_insert_rowid(conn)?;
                Self::set_tags(conn, word_id, &term.tags.join(","))?;
                if word_count > 1 {
                    Self::rescan_multiword(conn, lang_id, &word_lc, word_count, &tokenizer)?;
                }
                imported += 1;
            }
            Ok((imported, skipped))
        })
    }

    /// (lowercased text, word count) of every multi-word term of a language;
    /// input to the text parser's occurrence scan.
    pub fn multiword_terms(
        conn: &mut SqliteConnection,
        lang_id: i32,
    ) -> Result<Vec<(String, i32)>, AppError> {
        let rows = words::table
            .filter(words::lang_id.eq(lang_id))
            .filter(words::word_count.gt(1))
            .select((words::word_lc, words::word_count))
            .load(conn)?;
        Ok(rows)
    }

    /// Re-derives occurrence items for one multi-word term across all texts
    /// of its language. Ordinals are reproduced by walking the stored
    /// sentences in parse order.
    fn rescan_multiword(
        conn: &mut SqliteConnection,
        lang_id: i32,
        word_lc: &str,
        word_count: i32,
        tokenizer: &Tokenizer,
    ) -> Result<(), AppError> {
        Self::remove_multiword_items(conn, lang_id, word_lc)?;

        let text_ids: Vec<i32> = texts::table
            .filter(texts::lang_id.eq(lang_id))
            .select(texts::text_id)
            .load(conn)?;

        for text_id in text_ids {
            let sentence_rows: Vec<(i32, String)> = sentences::table
                .filter(sentences::text_id.eq(text_id))
                .order_by(sentences::ordinal.asc())
                .select((sentences::sentence_id, sentences::content))
                .load(conn)?;

            let mut new_items = Vec::new();
            let mut item_ordinal = 0;
            for (sentence_id, content) in sentence_rows {
                let tokens = tokenizer.tokenize(&content);
                let (sentence_lc, lc_starts) = tokenizer.lowercase_map(&tokens);
                let base_ordinal = item_ordinal;
                item_ordinal += tokens.len() as i32;

                for offset in tokenizer.find_occurrences(&sentence_lc, word_lc) {
                    if let Ok(idx) = lc_starts.binary_search(&offset) {
                        new_items.push(NewTextItem {
                            text_id,
                            sentence_id,
                            ordinal: base_ordinal + idx as i32,
                            word_count,
                            token: word_lc.to_string(),
                            token_lc: word_lc.to_string(),
                            is_word: true,
                        });
                    }
                }
            }
            for chunk in new_items.chunks(100) {
                diesel::insert_into(text_items::table)
                    .values(chunk)
                    .execute(conn)?;
            }
        }
        Ok(())
    }

    fn remove_multiword_items(
        conn: &mut SqliteConnection,
        lang_id: i32,
        word_lc: &str,
    ) -> Result<(), AppError> {
        let text_ids = texts::table
            .filter(texts::lang_id.eq(lang_id))
            .select(texts::text_id);
        diesel::delete(
            text_items::table
                .filter(text_items::text_id.eq_any(text_ids))
                .filter(text_items::token_lc.eq(word_lc))
                .filter(text_items::word_count.gt(1)),
        )
        .execute(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::repositories::test_support::{create_english, test_conn};

    fn form(lang_id: i32, word: &str) -> WordForm {
        WordForm {
            lang_id,
            word: word.to_string(),
            translation: "translation".to_string(),
            romanization: String::new(),
            sentence: String::new(),
            status: 1,
            tags: String::new(),
        }
    }

    #[test]
    fn duplicate_term_is_rejected_not_duplicated() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        WordRepository::create(&mut conn, &form(lang_id, "Haus")).unwrap();

        let result = WordRepository::create(&mut conn, &form(lang_id, "haus"));
        assert!(matches!(result, Err(AppError::Duplicate("term"))));

        let count: i64 = words::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn empty_term_is_a_validation_error() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let result = WordRepository::create(&mut conn, &form(lang_id, "  "));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn invalid_status_is_rejected() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let mut f = form(lang_id, "Haus");
        f.status = 7;
        assert!(matches!(
            WordRepository::create(&mut conn, &f),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn tags_are_created_and_replaced_as_a_set() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let mut f = form(lang_id, "Haus");
        f.tags = "noun, basics".to_string();
        let word_id = WordRepository::create(&mut conn, &f).unwrap();

        let tag_names: Vec<String> = WordRepository::tags_for(&mut conn, word_id)
            .unwrap()
            .into_iter()
            .map(|t| t.tag_name)
            .collect();
        assert_eq!(tag_names, vec!["basics", "noun"]);

        f.tags = "noun".to_string();
        WordRepository::update(&mut conn, word_id, &f).unwrap();
        assert_eq!(WordRepository::tags_for(&mut conn, word_id).unwrap().len(), 1);
    }

    #[test]
    fn bump_status_clamps_at_the_edges() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let word_id = WordRepository::create(&mut conn, &form(lang_id, "Haus")).unwrap();

        assert_eq!(WordRepository::bump_status(&mut conn, word_id, -1).unwrap(), 1);
        assert_eq!(WordRepository::bump_status(&mut conn, word_id, 1).unwrap(), 2);
        for _ in 0..10 {
            WordRepository::bump_status(&mut conn, word_id, 1).unwrap();
        }
        assert_eq!(WordRepository::find(&mut conn, word_id).unwrap().status, 5);
    }

    #[test]
    fn sentinel_statuses_can_be_assigned_directly() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let word_id = WordRepository::create(&mut conn, &form(lang_id, "Haus")).unwrap();

        WordRepository::set_status(&mut conn, word_id, 98).unwrap();
        assert_eq!(WordRepository::find(&mut conn, word_id).unwrap().status, 98);
        assert!(matches!(
            WordRepository::set_status(&mut conn, word_id, 42),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn overlong_expressions_are_rejected() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let result = WordRepository::create(&mut conn, &form(lang_id, "a b c d e f g h i j"));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn multi_word_terms_are_tracked() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        WordRepository::create(&mut conn, &form(lang_id, "of course")).unwrap();

        let multiwords = WordRepository::multiword_terms(&mut conn, lang_id).unwrap();
        assert_eq!(multiwords, vec![("of course".to_string(), 2)]);
    }

    #[test]
    fn bulk_import_skips_duplicates() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        WordRepository::create(&mut conn, &form(lang_id, "Haus")).unwrap();

        let upload = crate::features::import::parse_upload(
            "Haus\thouse\nBaum\ttree\t\t2\tnoun\nhaus\tanother\n",
        );
        let (imported, skipped) =
            WordRepository::bulk_import(&mut conn, lang_id, &upload).unwrap();
        assert_eq!(imported, 1);
        assert_eq!(skipped, 2);

        let baum = WordRepository::find_by_text(&mut conn, lang_id, "baum")
            .unwrap()
            .expect("imported term missing");
        assert_eq!(baum.status, 2);
        assert_eq!(WordRepository::tags_for(&mut conn, baum.word_id).unwrap().len(), 1);
    }

    #[test]
    fn similar_terms_rank_close_matches_first() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        WordRepository::create(&mut conn, &form(lang_id, "Haus")).unwrap();
        WordRepository::create(&mut conn, &form(lang_id, "Hausaufgabe")).unwrap();
        WordRepository::create(&mut conn, &form(lang_id, "Zeitung")).unwrap();

        let similar = WordRepository::similar(&mut conn, lang_id, "haus", 5).unwrap();
        assert_eq!(similar.first().map(|w| w.word.as_str()), Some("Haus"));
        assert!(!similar.iter().any(|w| w.word == "Zeitung"));
    }

    #[test]
    fn delete_removes_tag_links() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let mut f = form(lang_id, "Haus");
        f.tags = "noun".to_string();
        let word_id = WordRepository::create(&mut conn, &f).unwrap();

        WordRepository::delete(&mut conn, word_id).unwrap();
        let links: i64 = word_tags::table.count().get_result(&mut conn).unwrap();
        assert_eq!(links, 0);
        assert!(matches!(
            WordRepository::find(&mut conn, word_id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn duplicate_within_upload_batch_is_skipped() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let upload = crate::features::import::parse_upload("Baum\ttree\nBAUM\tTree\n");
        let (imported, skipped) =
            WordRepository::bulk_import(&mut conn, lang_id, &upload).unwrap();
        assert_eq!((imported, skipped), (1, 1));
    }
}
