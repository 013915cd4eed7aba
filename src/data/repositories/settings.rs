use std::str::FromStr;

use diesel::prelude::*;

use crate::data::models::AppError;
use crate::schema::settings;

// Tunables read through typed getters; absent keys fall back to these.
pub const MAX_SENTENCES_PER_TEXT: (&str, i64) = ("max_sentences_per_text", 50);
pub const TEXTS_PER_PAGE: (&str, i64) = ("texts_per_page", 10);
pub const WORDS_PER_PAGE: (&str, i64) = ("words_per_page", 50);
pub const SIMILAR_TERMS_COUNT: (&str, i64) = ("similar_terms_count", 5);
pub const FEED_MAX_LINKS: (&str, i64) = ("feed_max_links", 20);

pub struct SettingsRepository;

impl SettingsRepository {
    pub fn get(conn: &mut SqliteConnection, key: &str) -> Result<Option<String>, AppError> {
        let value = settings::table
            .filter(settings::st_key.eq(key))
            .select(settings::st_value)
            .first::<String>(conn)
            .optional()?;
        Ok(value)
    }

    /// Typed read with a default; unparseable stored values fall back too.
    pub fn get_parsed_or<T: FromStr>(
        conn: &mut SqliteConnection,
        setting: (&str, T),
    ) -> Result<T, AppError> {
        let (key, default) = setting;
        let value = Self::get(conn, key)?
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default);
        Ok(value)
    }

    pub fn set(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<(), AppError> {
        diesel::insert_into(settings::table)
            .values((settings::st_key.eq(key), settings::st_value.eq(value)))
            .on_conflict(settings::st_key)
            .do_update()
            .set(settings::st_value.eq(value))
            .execute(conn)?;
        Ok(())
    }

    pub fn all(conn: &mut SqliteConnection) -> Result<Vec<(String, String)>, AppError> {
        let rows = settings::table
            .order_by(settings::st_key.asc())
            .select((settings::st_key, settings::st_value))
            .load(conn)?;
        Ok(rows)
    }
}
