use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, Json, Redirect},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tera::{Context, Tera};
use validator::Validate;

use crate::{
    data::models::{
        AnswerResponse, AppError, SimilarParams, UploadForm, Word, WordForm, WordQuery,
    },
    data::repositories::{
        settings, LanguageRepository, SettingsRepository, TagRepository, WordRepository,
    },
    features::import::parse_upload,
    utils::{self, render_template},
    DbPool,
};

pub async fn list_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
    Query(mut query): Query<WordQuery>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    if query.lang.is_none() {
        query.lang = utils::current_lang_id(&session).await;
    }
    let per_page = SettingsRepository::get_parsed_or(&mut conn, settings::WORDS_PER_PAGE)?;
    let (words, total) = WordRepository::list(&mut conn, &query, per_page)?;
    let languages = LanguageRepository::list(&mut conn)?;
    let tags = TagRepository::list(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "Terms");
    context.insert("words", &words);
    context.insert("total", &total);
    context.insert("languages", &languages);
    context.insert("tags", &tags);
    context.insert("page", &query.page.unwrap_or(1));
    context.insert("pages", &((total as u64).div_ceil(per_page as u64) as i64).max(1));
    context.insert("filter_lang", &query.lang);
    context.insert("filter_status", &query.status);
    context.insert("filter_tag", &query.tag);
    context.insert("filter_query", &query.query.clone().unwrap_or_default());
    Ok(render_template(&tera, "words.html", context))
}

/// Prefill support for the reading view's "new term" link.
#[derive(Debug, Default, Deserialize)]
pub struct NewWordParams {
    pub lang: Option<i32>,
    pub term: Option<String>,
    pub sentence: Option<String>,
}

pub async fn new_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
    Query(params): Query<NewWordParams>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let languages = LanguageRepository::list(&mut conn)?;
    let lang = match params.lang {
        Some(lang) => Some(lang),
        None => utils::current_lang_id(&session).await,
    };

    let mut context = Context::new();
    context.insert("title", "New term");
    context.insert("languages", &languages);
    context.insert("current_lang", &lang);
    context.insert("prefill_term", &params.term.unwrap_or_default());
    context.insert("prefill_sentence", &params.sentence.unwrap_or_default());
    Ok(render_template(&tera, "word_form.html", context))
}

#[axum::debug_handler]
pub async fn handle_create(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Form(form): Form<WordForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    let word_id = WordRepository::create(&mut conn, &form)?;
    log::info!("Created term '{}' ({})", form.word.trim(), word_id);
    Ok(Redirect::to("/words"))
}

pub async fn edit_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    Path(word_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let word = WordRepository::find(&mut conn, word_id)?;
    let language = LanguageRepository::find(&mut conn, word.lang_id)?;
    let tags: Vec<String> = WordRepository::tags_for(&mut conn, word_id)?
        .into_iter()
        .map(|t| t.tag_name)
        .collect();
    let limit = SettingsRepository::get_parsed_or(&mut conn, settings::SIMILAR_TERMS_COUNT)?;
    let similar: Vec<Word> =
        WordRepository::similar(&mut conn, word.lang_id, &word.word, limit as usize)?
            .into_iter()
            .filter(|w| w.word_id != word_id)
            .collect();

    let mut context = Context::new();
    context.insert("title", "Edit term");
    context.insert("word", &word);
    context.insert("language", &language);
    context.insert("word_tags", &tags.join(", "));
    context.insert("similar", &similar);
    context.insert("prefill_term", "");
    context.insert("prefill_sentence", "");
    Ok(render_template(&tera, "word_form.html", context))
}

#[axum::debug_handler]
pub async fn handle_update(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(word_id): Path<i32>,
    Form(form): Form<WordForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    WordRepository::update(&mut conn, word_id, &form)?;
    Ok(Redirect::to("/words"))
}

pub async fn handle_delete(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(word_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let mut conn = pool.get()?;
    WordRepository::delete(&mut conn, word_id)?;
    Ok(Redirect::to("/words"))
}

pub async fn handle_set_status(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path((word_id, status)): Path<(i32, i32)>,
) -> Result<Json<AnswerResponse>, AppError> {
    let mut conn = pool.get()?;
    let status = WordRepository::set_status(&mut conn, word_id, status)?;
    Ok(Json(AnswerResponse { word_id, status }))
}

pub async fn handle_status_up(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(word_id): Path<i32>,
) -> Result<Json<AnswerResponse>, AppError> {
    let mut conn = pool.get()?;
    let status = WordRepository::bump_status(&mut conn, word_id, 1)?;
    Ok(Json(AnswerResponse { word_id, status }))
}

pub async fn handle_status_down(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(word_id): Path<i32>,
) -> Result<Json<AnswerResponse>, AppError> {
    let mut conn = pool.get()?;
    let status = WordRepository::bump_status(&mut conn, word_id, -1)?;
    Ok(Json(AnswerResponse { word_id, status }))
}

pub async fn similar_api(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<Vec<Word>>, AppError> {
    let mut conn = pool.get()?;
    let limit = SettingsRepository::get_parsed_or(&mut conn, settings::SIMILAR_TERMS_COUNT)?;
    let similar = WordRepository::similar(&mut conn, params.lang, &params.term, limit as usize)?;
    Ok(Json(similar))
}

pub async fn upload_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let languages = LanguageRepository::list(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "Import terms");
    context.insert("languages", &languages);
    context.insert("current_lang", &utils::current_lang_id(&session).await);
    Ok(render_template(&tera, "upload.html", context))
}

#[axum::debug_handler]
pub async fn handle_upload(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    Form(form): Form<UploadForm>,
) -> Result<Html<String>, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    let terms = parse_upload(&form.content);
    let (imported, skipped) = WordRepository::bulk_import(&mut conn, form.lang_id, &terms)?;
    log::info!("Term upload: {} imported, {} skipped", imported, skipped);

    let mut context = Context::new();
    context.insert("title", "Import result");
    context.insert("imported", &imported);
    context.insert("skipped", &skipped);
    Ok(render_template(&tera, "upload_done.html", context))
}

pub fn router(pool: DbPool, tera: Arc<Tera>) -> Router {
    Router::new()
        .route("/", get(list_page))
        .route("/new", get(new_page).post(handle_create))
        .route("/upload", get(upload_page).post(handle_upload))
        .route("/{id}/edit", get(edit_page).post(handle_update))
        .route("/{id}/delete", post(handle_delete))
        .with_state((pool, tera))
}

pub fn api_router(pool: DbPool, tera: Arc<Tera>) -> Router {
    Router::new()
        .route("/similar", get(similar_api))
        .route("/{id}/status/{value}", post(handle_set_status))
        .route("/{id}/status-up", post(handle_status_up))
        .route("/{id}/status-down", post(handle_status_down))
        .with_state((pool, tera))
}
