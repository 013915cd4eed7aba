use axum::{
    extract::{Form, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tera::{Context, Tera};
use validator::Validate;

use crate::{
    data::models::AppError,
    data::repositories::{settings, SettingsRepository},
    utils::render_template,
    DbPool,
};

#[derive(Debug, Deserialize, Validate)]
pub struct SettingsForm {
    #[validate(range(min = 1, max = 500, message = "Sentences per text must be 1-500"))]
    pub max_sentences_per_text: i64,
    #[validate(range(min = 1, max = 200))]
    pub texts_per_page: i64,
    #[validate(range(min = 1, max = 500))]
    pub words_per_page: i64,
    #[validate(range(min = 1, max = 50))]
    pub similar_terms_count: i64,
    #[validate(range(min = 1, max = 200))]
    pub feed_max_links: i64,
}

pub async fn settings_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;

    let mut context = Context::new();
    context.insert("title", "Settings");
    context.insert(
        "max_sentences_per_text",
        &SettingsRepository::get_parsed_or(&mut conn, settings::MAX_SENTENCES_PER_TEXT)?,
    );
    context.insert(
        "texts_per_page",
        &SettingsRepository::get_parsed_or(&mut conn, settings::TEXTS_PER_PAGE)?,
    );
    context.insert(
        "words_per_page",
        &SettingsRepository::get_parsed_or(&mut conn, settings::WORDS_PER_PAGE)?,
    );
    context.insert(
        "similar_terms_count",
        &SettingsRepository::get_parsed_or(&mut conn, settings::SIMILAR_TERMS_COUNT)?,
    );
    context.insert(
        "feed_max_links",
        &SettingsRepository::get_parsed_or(&mut conn, settings::FEED_MAX_LINKS)?,
    );
    Ok(render_template(&tera, "settings.html", context))
}

#[axum::debug_handler]
pub async fn handle_save(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    SettingsRepository::set(
        &mut conn,
        settings::MAX_SENTENCES_PER_TEXT.0,
        &form.max_sentences_per_text.to_string(),
    )?;
    SettingsRepository::set(
        &mut conn,
        settings::TEXTS_PER_PAGE.0,
        &form.texts_per_page.to_string(),
    )?;
    SettingsRepository::set(
        &mut conn,
        settings::WORDS_PER_PAGE.0,
        &form.words_per_page.to_string(),
    )?;
    SettingsRepository::set(
        &mut conn,
        settings::SIMILAR_TERMS_COUNT.0,
        &form.similar_terms_count.to_string(),
    )?;
    SettingsRepository::set(
        &mut conn,
        settings::FEED_MAX_LINKS.0,
        &form.feed_max_links.to_string(),
    )?;
    Ok(Redirect::to("/settings"))
}

pub fn router(pool: DbPool, tera: Arc<Tera>) -> Router {
    Router::new()
        .route("/", get(settings_page).post(handle_save))
        .with_state((pool, tera))
}
