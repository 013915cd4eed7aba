pub mod feeds;
pub mod languages;
pub mod settings;
pub mod tags;
pub mod texts;
pub mod words;

pub use feeds::FeedRepository;
pub use languages::LanguageRepository;
pub use settings::SettingsRepository;
pub use tags::TagRepository;
pub use texts::TextRepository;
pub use words::WordRepository;

use diesel::prelude::*;
use diesel::sql_types::Integer;

use crate::data::models::{AppError, Language};
use crate::features::tokenizer::Tokenizer;

/// Recovers the id of the row just inserted on this connection.
pub(crate) fn last_insert_rowid(
    conn: &mut SqliteConnection,
) -> Result<i32, diesel::result::Error> {
    diesel::select(diesel::dsl::sql::<Integer>("last_insert_rowid()")).get_result::<i32>(conn)
}

/// The language's character classes are validated at save time, but a bad
/// pattern sneaking in through old data still surfaces as a validation error
/// rather than a panic.
pub(crate) fn compile_tokenizer(lang: &Language) -> Result<Tokenizer, AppError> {
    Tokenizer::for_language(lang)
        .map_err(|e| AppError::Validation(format!("Invalid character class: {}", e)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use diesel::connection::SimpleConnection;
    use diesel::prelude::*;

    use crate::data::models::LanguageForm;
    use crate::data::repositories::LanguageRepository;

    pub fn test_conn() -> SqliteConnection {
        let mut conn =
            SqliteConnection::establish(":memory:").expect("in-memory database unavailable");
        conn.batch_execute(include_str!("../../../migrations/schema.sql"))
            .expect("schema bootstrap failed");
        conn
    }

    pub fn english_form() -> LanguageForm {
        LanguageForm {
            lang_name: "English".to_string(),
            dict_uri: String::new(),
            sentence_split: ".!?:;".to_string(),
            word_chars: "a-zA-Z'".to_string(),
            split_each_char: false,
            remove_spaces: false,
            right_to_left: false,
        }
    }

    pub fn create_english(conn: &mut SqliteConnection) -> i32 {
        LanguageRepository::create(conn, &english_form()).expect("language setup failed")
    }
}
