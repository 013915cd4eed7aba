use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::words;

/// A vocabulary entry (term) tied to a language. Status 1-5 are learning
/// levels, 98 = ignored, 99 = well-known.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = words)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Word {
    pub word_id: i32,
    pub lang_id: i32,
    pub word: String,
    pub word_lc: String,
    pub status: i32,
    pub translation: String,
    pub romanization: String,
    pub sentence: String,
    pub word_count: i32,
    pub created_at: NaiveDateTime,
    pub status_changed: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = words)]
pub struct NewWord<'a> {
    pub lang_id: i32,
    pub word: &'a str,
    pub word_lc: &'a str,
    pub status: i32,
    pub translation: &'a str,
    pub romanization: &'a str,
    pub sentence: &'a str,
    pub word_count: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WordForm {
    pub lang_id: i32,
    #[validate(length(min = 1, message = "Term is not set!"))]
    pub word: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub romanization: String,
    #[serde(default)]
    pub sentence: String,
    #[serde(default = "default_status")]
    pub status: i32,
    /// Comma-separated tag names; replaced as a set on save.
    #[serde(default)]
    pub tags: String,
}

fn default_status() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize)]
pub struct WordQuery {
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub lang: Option<i32>,
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub status: Option<i32>,
    pub query: Option<String>,
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub tag: Option<i32>,
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    pub lang: i32,
    pub term: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UploadForm {
    pub lang_id: i32,
    #[validate(length(min = 1, message = "Nothing to import!"))]
    pub content: String,
}

/// Standard API response format
#[derive(Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}
