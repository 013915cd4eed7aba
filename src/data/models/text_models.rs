use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::{sentences, text_items, texts};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = texts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Text {
    pub text_id: i32,
    pub lang_id: i32,
    pub title: String,
    pub body: String,
    pub source_uri: Option<String>,
    pub annotated: String,
    pub archived: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = texts)]
pub struct NewText<'a> {
    pub lang_id: i32,
    pub title: &'a str,
    pub body: &'a str,
    pub source_uri: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = sentences)]
pub struct NewSentence<'a> {
    pub text_id: i32,
    pub ordinal: i32,
    pub content: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = text_items)]
pub struct NewTextItem {
    pub text_id: i32,
    pub sentence_id: i32,
    pub ordinal: i32,
    pub word_count: i32,
    pub token: String,
    pub token_lc: String,
    pub is_word: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TextForm {
    pub lang_id: i32,
    #[validate(length(min = 1, message = "Title is not set!"))]
    pub title: String,
    #[validate(length(min = 1, message = "Text is not set!"))]
    pub body: String,
    #[serde(default)]
    pub source_uri: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LongImportForm {
    pub lang_id: i32,
    #[validate(length(min = 1, message = "Title is not set!"))]
    pub title: String,
    #[validate(length(min = 1, message = "Text is not set!"))]
    pub body: String,
    /// "newline" splits paragraphs at every line break, "blank" at blank lines.
    #[serde(default)]
    pub paragraph_mode: Option<String>,
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub max_sentences: Option<usize>,
}

/// List filters, all optional; paging is 1-based.
#[derive(Debug, Default, Deserialize)]
pub struct TextQuery {
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub lang: Option<i32>,
    pub query: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TextListEntry {
    pub text_id: i32,
    pub title: String,
    pub lang_name: String,
    pub archived: bool,
    pub created_at: NaiveDateTime,
}

/// One token of the reading view, joined against the user's terms.
#[derive(Debug, Serialize)]
pub struct ReadingToken {
    pub token: String,
    pub is_word: bool,
    pub word_id: Option<i32>,
    pub status: Option<i32>,
    pub translation: Option<String>,
    pub romanization: Option<String>,
}
