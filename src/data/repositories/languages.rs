use diesel::prelude::*;

use crate::data::models::{AppError, Language, LanguageForm, NewLanguage};
use crate::data::repositories::last_insert_rowid;
use crate::features::tokenizer::Tokenizer;
use crate::schema::{feed_articles, feeds, languages, sentences, text_items, texts, word_tags, words};

pub struct LanguageRepository;

impl LanguageRepository {
    pub fn list(conn: &mut SqliteConnection) -> Result<Vec<Language>, AppError> {
        let langs = languages::table
            .select(Language::as_select())
            .order_by(languages::lang_name.asc())
            .load(conn)?;
        Ok(langs)
    }

    pub fn find(conn: &mut SqliteConnection, lang_id: i32) -> Result<Language, AppError> {
        languages::table
            .filter(languages::lang_id.eq(lang_id))
            .select(Language::as_select())
            .first(conn)
            .optional()?
            .ok_or(AppError::NotFound("Language"))
    }

    pub fn create(conn: &mut SqliteConnection, form: &LanguageForm) -> Result<i32, AppError> {
        Self::check_patterns(form)?;
        if Self::name_exists(conn, &form.lang_name, None)? {
            return Err(AppError::Duplicate("language"));
        }

        diesel::insert_into(languages::table)
            .values(&NewLanguage {
                lang_name: form.lang_name.trim(),
                dict_uri: form.dict_uri.trim(),
                sentence_split: &form.sentence_split,
                word_chars: &form.word_chars,
                split_each_char: form.split_each_char,
                remove_spaces: form.remove_spaces,
                right_to_left: form.right_to_left,
            })
            .execute(conn)?;

        Ok(last_insert_rowid(conn)?)
    }

    pub fn update(
        conn: &mut SqliteConnection,
        lang_id: i32,
        form: &LanguageForm,
    ) -> Result<(), AppError> {
        Self::check_patterns(form)?;
        if Self::name_exists(conn, &form.lang_name, Some(lang_id))? {
            return Err(AppError::Duplicate("language"));
        }

        let updated = diesel::update(languages::table.filter(languages::lang_id.eq(lang_id)))
            .set((
                languages::lang_name.eq(form.lang_name.trim()),
                languages::dict_uri.eq(form.dict_uri.trim()),
                languages::sentence_split.eq(&form.sentence_split),
                languages::word_chars.eq(&form.word_chars),
                languages::split_each_char.eq(form.split_each_char),
                languages::remove_spaces.eq(form.remove_spaces),
                languages::right_to_left.eq(form.right_to_left),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(AppError::NotFound("Language"));
        }
        Ok(())
    }

    /// Removes the language and everything hanging off it: terms with their
    /// tag links, texts with their sentences/items, feeds with their articles.
    pub fn delete_cascade(conn: &mut SqliteConnection, lang_id: i32) -> Result<(), AppError> {
        conn.transaction::<_, AppError, _>(|conn| {
            let feed_ids = feeds::table
                .filter(feeds::lang_id.eq(lang_id))
                .select(feeds::feed_id);
            diesel::delete(feed_articles::table.filter(feed_articles::feed_id.eq_any(feed_ids)))
                .execute(conn)?;
            diesel::delete(feeds::table.filter(feeds::lang_id.eq(lang_id))).execute(conn)?;

            let word_ids = words::table
                .filter(words::lang_id.eq(lang_id))
                .select(words::word_id);
            diesel::delete(word_tags::table.filter(word_tags::word_id.eq_any(word_ids)))
                .execute(conn)?;
            diesel::delete(words::table.filter(words::lang_id.eq(lang_id))).execute(conn)?;

            let text_ids = texts::table
                .filter(texts::lang_id.eq(lang_id))
                .select(texts::text_id);
            diesel::delete(
                text_items::table.filter(text_items::text_id.eq_any(text_ids.clone())),
            )
            .execute(conn)?;
            diesel::delete(sentences::table.filter(sentences::text_id.eq_any(text_ids)))
                .execute(conn)?;
            diesel::delete(texts::table.filter(texts::lang_id.eq(lang_id))).execute(conn)?;

            let deleted =
                diesel::delete(languages::table.filter(languages::lang_id.eq(lang_id)))
                    .execute(conn)?;
            if deleted == 0 {
                return Err(AppError::NotFound("Language"));
            }
            Ok(())
        })
    }

    pub fn name_exists(
        conn: &mut SqliteConnection,
        name: &str,
        exclude: Option<i32>,
    ) -> Result<bool, AppError> {
        use diesel::dsl::exists;
        use diesel::select;

        let name = name.trim();
        let found = match exclude {
            Some(lang_id) => select(exists(
                languages::table
                    .filter(languages::lang_name.eq(name))
                    .filter(languages::lang_id.ne(lang_id)),
            ))
            .get_result(conn)?,
            None => select(exists(languages::table.filter(languages::lang_name.eq(name))))
                .get_result(conn)?,
        };
        Ok(found)
    }

    fn check_patterns(form: &LanguageForm) -> Result<(), AppError> {
        Tokenizer::new(
            &form.word_chars,
            &form.sentence_split,
            form.split_each_char,
            form.remove_spaces,
        )
        .map_err(|e| AppError::Validation(format!("Invalid character class: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::repositories::test_support::{create_english, english_form, test_conn};

    #[test]
    fn create_and_find() {
        let mut conn = test_conn();
        let id = create_english(&mut conn);
        let lang = LanguageRepository::find(&mut conn, id).unwrap();
        assert_eq!(lang.lang_name, "English");
        assert!(!lang.split_each_char);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut conn = test_conn();
        create_english(&mut conn);
        let result = LanguageRepository::create(&mut conn, &english_form());
        assert!(matches!(result, Err(AppError::Duplicate("language"))));
    }

    #[test]
    fn invalid_character_class_is_rejected() {
        let mut conn = test_conn();
        let mut form = english_form();
        form.word_chars = "z-a".to_string();
        let result = LanguageRepository::create(&mut conn, &form);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn rename_to_existing_name_is_rejected() {
        let mut conn = test_conn();
        create_english(&mut conn);
        let mut form = english_form();
        form.lang_name = "German".to_string();
        let german = LanguageRepository::create(&mut conn, &form).unwrap();
        form.lang_name = "English".to_string();
        let result = LanguageRepository::update(&mut conn, german, &form);
        assert!(matches!(result, Err(AppError::Duplicate("language"))));
    }

    #[test]
    fn missing_language_is_not_found() {
        let mut conn = test_conn();
        assert!(matches!(
            LanguageRepository::find(&mut conn, 17),
            Err(AppError::NotFound(_))
        ));
    }
}
