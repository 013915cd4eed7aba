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
    data::models::{AppError, TagForm},
    data::repositories::TagRepository,
    utils::render_template,
    DbPool,
};

pub async fn list_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let tags = TagRepository::list_with_counts(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "Tags");
    context.insert("tags", &tags);
    Ok(render_template(&tera, "tags.html", context))
}

pub async fn new_page(
    State((_pool, tera)): State<(DbPool, Arc<Tera>)>,
) -> Result<Html<String>, AppError> {
    let mut context = Context::new();
    context.insert("title", "New tag");
    Ok(render_template(&tera, "tag_form.html", context))
}

#[axum::debug_handler]
pub async fn handle_create(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Form(form): Form<TagForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    TagRepository::create(&mut conn, &form)?;
    Ok(Redirect::to("/tags"))
}

pub async fn edit_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    Path(tag_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let tag = TagRepository::find(&mut conn, tag_id)?;

    let mut context = Context::new();
    context.insert("title", "Edit tag");
    context.insert("tag", &tag);
    Ok(render_template(&tera, "tag_form.html", context))
}

#[axum::debug_handler]
pub async fn handle_update(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(tag_id): Path<i32>,
    Form(form): Form<TagForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    TagRepository::update(&mut conn, tag_id, &form)?;
    Ok(Redirect::to("/tags"))
}

pub async fn handle_delete(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(tag_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let mut conn = pool.get()?;
    TagRepository::delete(&mut conn, tag_id)?;
    Ok(Redirect::to("/tags"))
}

pub fn router(pool: DbPool, tera: Arc<Tera>) -> Router {
    Router::new()
        .route("/", get(list_page))
        .route("/new", get(new_page).post(handle_create))
        .route("/{id}/edit", get(edit_page).post(handle_update))
        .route("/{id}/delete", post(handle_delete))
        .with_state((pool, tera))
}
