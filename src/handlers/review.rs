use axum::{
    extract::{Path, Query, State},
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;
use tera::{Context, Tera};

use crate::{
    data::models::{AnswerRequest, AnswerResponse, AppError, ReviewFilter, ReviewTerm, Word},
    data::repositories::LanguageRepository,
    features::review::{is_due, Answer, ReviewEngine, STATUS_MAX, STATUS_MIN},
    schema::{text_items, word_tags, words},
    utils::{self, render_template},
    DbPool,
};

const DEFAULT_SESSION_SIZE: usize = 20;

/// Selection form plus the due-count per language.
pub async fn setup_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    session: tower_sessions::Session,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let languages = LanguageRepository::list(&mut conn)?;

    let now = Utc::now().naive_utc();
    let mut due_counts: Vec<(String, i32, i64)> = Vec::new();
    for language in &languages {
        let candidates: Vec<(i32, chrono::NaiveDateTime)> = words::table
            .filter(words::lang_id.eq(language.lang_id))
            .filter(words::status.between(STATUS_MIN, STATUS_MAX))
            .select((words::status, words::status_changed))
            .load(&mut conn)?;
        let due = candidates
            .iter()
            .filter(|(status, changed)| is_due(*status, *changed, now))
            .count() as i64;
        due_counts.push((language.lang_name.clone(), language.lang_id, due));
    }

    let mut context = Context::new();
    context.insert("title", "Review");
    context.insert("languages", &languages);
    context.insert("due_counts", &due_counts);
    context.insert("current_lang", &utils::current_lang_id(&session).await);
    Ok(render_template(&tera, "review.html", context))
}

/// Serves the due terms of the selected scope, oldest status change first.
pub async fn session_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    Query(filter): Query<ReviewFilter>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let language = LanguageRepository::find(&mut conn, filter.lang)?;

    let status_min = filter.status_min.unwrap_or(STATUS_MIN).clamp(STATUS_MIN, STATUS_MAX);
    let status_max = filter.status_max.unwrap_or(STATUS_MAX).clamp(status_min, STATUS_MAX);

    let mut query = words::table
        .select(Word::as_select())
        .filter(words::lang_id.eq(filter.lang))
        .filter(words::status.between(status_min, status_max))
        .into_boxed();
    if let Some(text_id) = filter.text {
        let tokens = text_items::table
            .filter(text_items::text_id.eq(text_id))
            .filter(text_items::is_word.eq(true))
            .select(text_items::token_lc)
            .distinct();
        query = query.filter(words::word_lc.eq_any(tokens));
    }
    if let Some(tag_id) = filter.tag {
        let tagged = word_tags::table
            .filter(word_tags::tag_id.eq(tag_id))
            .select(word_tags::word_id);
        query = query.filter(words::word_id.eq_any(tagged));
    }

    let now = Utc::now().naive_utc();
    let terms: Vec<ReviewTerm> = query
        .order_by(words::status_changed.asc())
        .load::<Word>(&mut conn)?
        .into_iter()
        .filter(|word| is_due(word.status, word.status_changed, now))
        .take(filter.count.unwrap_or(DEFAULT_SESSION_SIZE))
        .map(|word| ReviewTerm {
            word_id: word.word_id,
            word: word.word,
            status: word.status,
            translation: word.translation,
            romanization: word.romanization,
            sentence: word.sentence,
        })
        .collect();

    let mut context = Context::new();
    context.insert("title", &format!("Review: {}", language.lang_name));
    context.insert("language", &language);
    context.insert("terms", &terms);
    Ok(render_template(&tera, "review_session.html", context))
}

#[axum::debug_handler]
pub async fn handle_answer(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(word_id): Path<i32>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let answer = Answer::from_grade(request.grade)
        .ok_or_else(|| AppError::Validation("Invalid grade".to_string()))?;
    let mut conn = pool.get()?;
    let status = ReviewEngine::new(&mut conn).record_answer(word_id, answer)?;
    Ok(Json(AnswerResponse { word_id, status }))
}

pub fn router(pool: DbPool, tera: Arc<Tera>) -> Router {
    Router::new()
        .route("/", get(setup_page))
        .route("/session", get(session_page))
        .with_state((pool, tera))
}

pub fn api_router(pool: DbPool, tera: Arc<Tera>) -> Router {
    Router::new()
        .route("/{id}/answer", post(handle_answer))
        .with_state((pool, tera))
}
