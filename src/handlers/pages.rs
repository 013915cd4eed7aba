use axum::{
    extract::State,
    response::Html,
    routing::get,
    Router,
};
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;
use tera::{Context, Tera};

use crate::{
    data::models::AppError,
    features::review::{is_due, STATUS_MAX, STATUS_MIN},
    schema::{languages, texts, words},
    utils::render_template,
    DbPool,
};

pub async fn home(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;

    let language_count: i64 = languages::table.count().get_result(&mut conn)?;
    let text_count: i64 = texts::table
        .filter(texts::archived.eq(false))
        .count()
        .get_result(&mut conn)?;
    let term_count: i64 = words::table.count().get_result(&mut conn)?;

    let now = Utc::now().naive_utc();
    let due_count = words::table
        .filter(words::status.between(STATUS_MIN, STATUS_MAX))
        .select((words::status, words::status_changed))
        .load::<(i32, chrono::NaiveDateTime)>(&mut conn)?
        .into_iter()
        .filter(|(status, changed)| is_due(*status, *changed, now))
        .count();

    let mut context = Context::new();
    context.insert("title", "Home");
    context.insert("language_count", &language_count);
    context.insert("text_count", &text_count);
    context.insert("term_count", &term_count);
    context.insert("due_count", &due_count);
    Ok(render_template(&tera, "home.html", context))
}

pub fn router(pool: DbPool, tera: Arc<Tera>) -> Router {
    Router::new().route("/", get(home)).with_state((pool, tera))
}
