use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::languages;

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = languages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Language {
    pub lang_id: i32,
    pub lang_name: String,
    pub dict_uri: String,
    pub sentence_split: String,
    pub word_chars: String,
    pub split_each_char: bool,
    pub remove_spaces: bool,
    pub right_to_left: bool,
}

#[derive(Insertable)]
#[diesel(table_name = languages)]
pub struct NewLanguage<'a> {
    pub lang_name: &'a str,
    pub dict_uri: &'a str,
    pub sentence_split: &'a str,
    pub word_chars: &'a str,
    pub split_each_char: bool,
    pub remove_spaces: bool,
    pub right_to_left: bool,
}

/// Form payload for creating/editing a language. The two character classes
/// are validated by compiling them in the tokenizer before saving.
#[derive(Debug, Deserialize, Validate)]
pub struct LanguageForm {
    #[validate(length(min = 1, message = "Language name is not set!"))]
    pub lang_name: String,
    #[serde(default)]
    pub dict_uri: String,
    #[serde(default = "default_sentence_split")]
    pub sentence_split: String,
    #[serde(default = "default_word_chars")]
    pub word_chars: String,
    #[serde(default)]
    pub split_each_char: bool,
    #[serde(default)]
    pub remove_spaces: bool,
    #[serde(default)]
    pub right_to_left: bool,
}

fn default_sentence_split() -> String {
    ".!?:;".to_string()
}

fn default_word_chars() -> String {
    "a-zA-ZÀ-ÖØ-öø-ȳäöüÄÖÜß".to_string()
}
