use axum::{
    extract::{Form, Path, Query, State},
    routing::{get, post},
    response::{Html, Json, Redirect},
    Router,
};
use std::sync::Arc;
use tera::{Context, Tera};
use validator::Validate;

use crate::{
    data::models::{ApiResponse, AppError, LongImportForm, TextForm, TextQuery},
    data::repositories::{
        settings, LanguageRepository, SettingsRepository, TextRepository,
    },
    features::splitter::{ParagraphMode, SplitOptions},
    utils::{self, render_template},
    DbPool,
};

pub async fn list_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
    Query(mut query): Query<TextQuery>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    if query.lang.is_none() {
        query.lang = utils::current_lang_id(&session).await;
    }
    let per_page = SettingsRepository::get_parsed_or(&mut conn, settings::TEXTS_PER_PAGE)?;
    let (texts, total) = TextRepository::list(&mut conn, &query, per_page)?;
    let languages = LanguageRepository::list(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "Texts");
    context.insert("texts", &texts);
    context.insert("total", &total);
    context.insert("languages", &languages);
    context.insert("page", &query.page.unwrap_or(1));
    context.insert("pages", &((total as u64).div_ceil(per_page as u64) as i64).max(1));
    context.insert("archived", &query.archived);
    context.insert("current_text", &utils::current_text_id(&session).await);
    context.insert("filter_lang", &query.lang);
    context.insert("filter_query", &query.query.clone().unwrap_or_default());
    Ok(render_template(&tera, "texts.html", context))
}

pub async fn new_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let languages = LanguageRepository::list(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "New text");
    context.insert("languages", &languages);
    context.insert("current_lang", &utils::current_lang_id(&session).await);
    Ok(render_template(&tera, "text_form.html", context))
}

#[axum::debug_handler]
pub async fn handle_create(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
    Form(form): Form<TextForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    let lang = LanguageRepository::find(&mut conn, form.lang_id)?;
    let source_uri = Some(form.source_uri.trim()).filter(|s| !s.is_empty());
    let text_id =
        TextRepository::create_parsed(&mut conn, &lang, form.title.trim(), &form.body, source_uri)?;
    utils::set_current_text(&session, text_id).await;
    log::info!("Imported text {} ({})", form.title.trim(), text_id);
    Ok(Redirect::to(&format!("/texts/{}", text_id)))
}

pub async fn read_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
    Path(text_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let text = TextRepository::find(&mut conn, text_id)?;
    let language = LanguageRepository::find(&mut conn, text.lang_id)?;
    let sentences = TextRepository::reading_view(&mut conn, text_id)?;
    let (total_words, unknown_words) = TextRepository::word_stats(&mut conn, text_id)?;
    utils::set_current_text(&session, text_id).await;

    let mut context = Context::new();
    context.insert("title", &text.title);
    context.insert("text", &text);
    context.insert("language", &language);
    context.insert("sentences", &sentences);
    context.insert("total_words", &total_words);
    context.insert("unknown_words", &unknown_words);
    Ok(render_template(&tera, "text_read.html", context))
}

pub async fn edit_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    Path(text_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let text = TextRepository::find(&mut conn, text_id)?;
    let languages = LanguageRepository::list(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "Edit text");
    context.insert("text", &text);
    context.insert("languages", &languages);
    context.insert("current_lang", &text.lang_id);
    Ok(render_template(&tera, "text_form.html", context))
}

#[axum::debug_handler]
pub async fn handle_update(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(text_id): Path<i32>,
    Form(form): Form<TextForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    let lang = LanguageRepository::find(&mut conn, form.lang_id)?;
    let source_uri = Some(form.source_uri.trim()).filter(|s| !s.is_empty());
    TextRepository::update_parsed(
        &mut conn,
        text_id,
        &lang,
        form.title.trim(),
        &form.body,
        source_uri,
    )?;
    Ok(Redirect::to(&format!("/texts/{}", text_id)))
}

pub async fn handle_delete(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(text_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let mut conn = pool.get()?;
    TextRepository::delete(&mut conn, text_id)?;
    log::info!("Deleted text {}", text_id);
    Ok(Redirect::to("/texts"))
}

pub async fn handle_archive(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(text_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let mut conn = pool.get()?;
    TextRepository::set_archived(&mut conn, text_id, true)?;
    Ok(Redirect::to("/texts"))
}

pub async fn handle_unarchive(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(text_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let mut conn = pool.get()?;
    TextRepository::set_archived(&mut conn, text_id, false)?;
    Ok(Redirect::to("/texts?archived=true"))
}

pub async fn handle_reparse(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(text_id): Path<i32>,
) -> Result<Json<ApiResponse>, AppError> {
    let mut conn = pool.get()?;
    TextRepository::reparse(&mut conn, text_id)?;
    Ok(Json(ApiResponse {
        success: true,
        message: "Text reparsed".to_string(),
    }))
}

pub async fn handle_mark_known(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(text_id): Path<i32>,
) -> Result<Json<ApiResponse>, AppError> {
    let mut conn = pool.get()?;
    let created = TextRepository::mark_all_known(&mut conn, text_id)?;
    Ok(Json(ApiResponse {
        success: true,
        message: format!("{} terms set to well-known", created),
    }))
}

/// Regenerates the annotation and shows it as a printable page.
pub async fn annotated_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    Path(text_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let text = TextRepository::find(&mut conn, text_id)?;
    let annotated = TextRepository::annotate(&mut conn, text_id)?;

    let lines: Vec<(String, String)> = annotated
        .lines()
        .map(|line| {
            let (token, translation) = line.split_once('\t').unwrap_or((line, ""));
            (token.to_string(), translation.to_string())
        })
        .collect();

    let mut context = Context::new();
    context.insert("title", &format!("{} (annotated)", text.title));
    context.insert("text", &text);
    context.insert("lines", &lines);
    Ok(render_template(&tera, "text_annotated.html", context))
}

pub async fn long_import_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let languages = LanguageRepository::list(&mut conn)?;
    let max_sentences =
        SettingsRepository::get_parsed_or(&mut conn, settings::MAX_SENTENCES_PER_TEXT)?;

    let mut context = Context::new();
    context.insert("title", "Import long text");
    context.insert("languages", &languages);
    context.insert("current_lang", &utils::current_lang_id(&session).await);
    context.insert("max_sentences", &max_sentences);
    Ok(render_template(&tera, "long_import.html", context))
}

#[axum::debug_handler]
pub async fn handle_long_import(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    Form(form): Form<LongImportForm>,
) -> Result<Html<String>, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    let lang = LanguageRepository::find(&mut conn, form.lang_id)?;
    let default_max =
        SettingsRepository::get_parsed_or(&mut conn, settings::MAX_SENTENCES_PER_TEXT)?;
    let opts = SplitOptions {
        max_sentences: form.max_sentences.unwrap_or(default_max as usize),
        mode: ParagraphMode::from_param(form.paragraph_mode.as_deref()),
    };

    let ids = TextRepository::import_long(&mut conn, &lang, form.title.trim(), &form.body, &opts)?;
    log::info!(
        "Long text '{}' split into {} texts",
        form.title.trim(),
        ids.len()
    );

    let mut context = Context::new();
    context.insert("title", "Long text imported");
    context.insert("base_title", form.title.trim());
    context.insert("text_ids", &ids);
    Ok(render_template(&tera, "long_import_done.html", context))
}

pub fn router(pool: DbPool, tera: Arc<Tera>) -> Router {
    Router::new()
        .route("/", get(list_page))
        .route("/new", get(new_page).post(handle_create))
        .route("/import-long", get(long_import_page).post(handle_long_import))
        .route("/{id}", get(read_page))
        .route("/{id}/edit", get(edit_page).post(handle_update))
        .route("/{id}/delete", post(handle_delete))
        .route("/{id}/archive", post(handle_archive))
        .route("/{id}/unarchive", post(handle_unarchive))
        .route("/{id}/reparse", post(handle_reparse))
        .route("/{id}/mark-known", post(handle_mark_known))
        .route("/{id}/annotated", get(annotated_page))
        .with_state((pool, tera))
}
