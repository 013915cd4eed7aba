use axum::{
    extract::{Form, Path, State},
    response::{Html, Redirect},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tera::{Context, Tera};
use validator::Validate;

use crate::{
    data::models::{AppError, LanguageForm},
    data::repositories::LanguageRepository,
    utils::{self, render_template},
    DbPool,
};

pub async fn list_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let languages = LanguageRepository::list(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "Languages");
    context.insert("languages", &languages);
    context.insert("current_lang", &utils::current_lang_id(&session).await);
    Ok(render_template(&tera, "languages.html", context))
}

pub async fn new_page(
    State((_pool, tera)): State<(DbPool, Arc<Tera>)>,
) -> Result<Html<String>, AppError> {
    let mut context = Context::new();
    context.insert("title", "New language");
    Ok(render_template(&tera, "language_form.html", context))
}

#[axum::debug_handler]
pub async fn handle_create(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
    Form(form): Form<LanguageForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    let lang_id = LanguageRepository::create(&mut conn, &form)?;
    utils::set_current_lang(&session, lang_id).await;
    log::info!("Created language {} ({})", form.lang_name, lang_id);
    Ok(Redirect::to("/languages"))
}

pub async fn edit_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    Path(lang_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let language = LanguageRepository::find(&mut conn, lang_id)?;

    let mut context = Context::new();
    context.insert("title", "Edit language");
    context.insert("language", &language);
    Ok(render_template(&tera, "language_form.html", context))
}

#[axum::debug_handler]
pub async fn handle_update(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(lang_id): Path<i32>,
    Form(form): Form<LanguageForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    LanguageRepository::update(&mut conn, lang_id, &form)?;
    Ok(Redirect::to("/languages"))
}

pub async fn handle_delete(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
    Path(lang_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let mut conn = pool.get()?;
    LanguageRepository::delete_cascade(&mut conn, lang_id)?;
    if utils::current_lang_id(&session).await == Some(lang_id) {
        utils::clear_current_lang(&session).await;
    }
    log::info!("Deleted language {} with all its data", lang_id);
    Ok(Redirect::to("/languages"))
}

/// Makes the language the session's current one; lists default to it.
pub async fn handle_select(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
    Path(lang_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let mut conn = pool.get()?;
    LanguageRepository::find(&mut conn, lang_id)?;
    utils::set_current_lang(&session, lang_id).await;
    Ok(Redirect::to("/texts"))
}

pub fn router(pool: DbPool, tera: Arc<Tera>) -> Router {
    Router::new()
        .route("/", get(list_page))
        .route("/new", get(new_page).post(handle_create))
        .route("/{id}/edit", get(edit_page).post(handle_update))
        .route("/{id}/delete", post(handle_delete))
        .route("/{id}/select", post(handle_select))
        .with_state((pool, tera))
}
