use axum::{
    extract::{Form, Path, State},
    response::{Html, Json, Redirect},
    routing::{get, post},
    Router,
};
use futures_util::future::join_all;
use std::sync::Arc;
use tera::{Context, Tera};
use validator::Validate;

use crate::{
    data::models::{ApiResponse, AppError, Feed, FeedForm},
    data::repositories::{
        settings, FeedRepository, LanguageRepository, SettingsRepository, TextRepository,
    },
    features::feeds::{extract_text, parse_feed, parse_tag_list, ArticleSource, FeedOptions},
    utils::render_template,
    DbPool,
};

pub async fn list_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let feeds = FeedRepository::list_with_language(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "Feeds");
    context.insert("feeds", &feeds);
    Ok(render_template(&tera, "feeds.html", context))
}

pub async fn new_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let languages = LanguageRepository::list(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "New feed");
    context.insert("languages", &languages);
    Ok(render_template(&tera, "feed_form.html", context))
}

#[axum::debug_handler]
pub async fn handle_create(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Form(form): Form<FeedForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    LanguageRepository::find(&mut conn, form.lang_id)?;
    let feed_id = FeedRepository::create(&mut conn, &form)?;
    log::info!("Created feed '{}' ({})", form.feed_name.trim(), feed_id);
    Ok(Redirect::to("/feeds"))
}

pub async fn edit_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    Path(feed_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let feed = FeedRepository::find(&mut conn, feed_id)?;
    let languages = LanguageRepository::list(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "Edit feed");
    context.insert("feed", &feed);
    context.insert("languages", &languages);
    Ok(render_template(&tera, "feed_form.html", context))
}

#[axum::debug_handler]
pub async fn handle_update(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(feed_id): Path<i32>,
    Form(form): Form<FeedForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mut conn = pool.get()?;
    FeedRepository::update(&mut conn, feed_id, &form)?;
    Ok(Redirect::to("/feeds"))
}

pub async fn handle_delete(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(feed_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let mut conn = pool.get()?;
    FeedRepository::delete_cascade(&mut conn, feed_id)?;
    log::info!("Deleted feed {} and its articles", feed_id);
    Ok(Redirect::to("/feeds"))
}

pub async fn articles_page(
    State((pool, tera)): State<(DbPool, Arc<Tera>)>,
    Path(feed_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let mut conn = pool.get()?;
    let feed = FeedRepository::find(&mut conn, feed_id)?;
    let articles = FeedRepository::articles(&mut conn, feed_id)?;

    let mut context = Context::new();
    context.insert("title", &format!("Articles of {}", feed.feed_name));
    context.insert("feed", &feed);
    context.insert("articles", &articles);
    Ok(render_template(&tera, "feed_articles.html", context))
}

/// Fetches the source and stores new article links.
pub async fn handle_refresh(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path(feed_id): Path<i32>,
) -> Result<Json<ApiResponse>, AppError> {
    let mut conn = pool.get()?;
    let feed = FeedRepository::find(&mut conn, feed_id)?;
    let default_max = SettingsRepository::get_parsed_or(&mut conn, settings::FEED_MAX_LINKS)?;

    let inserted = refresh_one(&pool, &feed, default_max as usize).await?;
    Ok(Json(ApiResponse {
        success: true,
        message: format!("{} new articles", inserted),
    }))
}

/// Refreshes every feed whose autoupdate interval has elapsed, fetching
/// concurrently. A failing feed is logged and skipped, not fatal.
pub async fn handle_refresh_due(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
) -> Result<Json<ApiResponse>, AppError> {
    let mut conn = pool.get()?;
    let due = FeedRepository::due_for_update(&mut conn)?;
    let default_max = SettingsRepository::get_parsed_or(&mut conn, settings::FEED_MAX_LINKS)?;
    drop(conn);

    let results = join_all(
        due.iter()
            .map(|feed| refresh_one(&pool, feed, default_max as usize)),
    )
    .await;

    let mut refreshed = 0;
    for (feed, result) in due.iter().zip(results) {
        match result {
            Ok(_) => refreshed += 1,
            Err(e) => log::warn!("Refresh of feed '{}' failed: {}", feed.feed_name, e),
        }
    }
    Ok(Json(ApiResponse {
        success: true,
        message: format!("{} of {} due feeds refreshed", refreshed, due.len()),
    }))
}

async fn refresh_one(pool: &DbPool, feed: &Feed, default_max: usize) -> Result<usize, AppError> {
    let options = FeedOptions::parse(&feed.options);
    let body = fetch(feed.source_uri.clone()).await?;
    let items = parse_feed(&body)?;
    let max_links = options.max_links.unwrap_or(default_max);

    let mut conn = pool.get()?;
    let inserted = FeedRepository::upsert_articles(&mut conn, feed.feed_id, &items, max_links)?;
    FeedRepository::touch(&mut conn, feed.feed_id)?;
    log::info!(
        "Feed '{}': {} items fetched, {} new",
        feed.feed_name,
        items.len(),
        inserted
    );
    Ok(inserted)
}

/// Turns one article into a text in the feed's language.
pub async fn handle_import_article(
    State((pool, _tera)): State<(DbPool, Arc<Tera>)>,
    Path((feed_id, article_id)): Path<(i32, i32)>,
) -> Result<Redirect, AppError> {
    let mut conn = pool.get()?;
    let feed = FeedRepository::find(&mut conn, feed_id)?;
    let article = FeedRepository::find_article(&mut conn, article_id)?;
    if article.feed_id != feed_id {
        return Err(AppError::NotFound("Article"));
    }
    if let Some(text_id) = article.text_id {
        return Ok(Redirect::to(&format!("/texts/{}", text_id)));
    }

    let lang = LanguageRepository::find(&mut conn, feed.lang_id)?;
    let options = FeedOptions::parse(&feed.options);
    let body = match options.article_source {
        ArticleSource::Description => extract_text(&article.description, &[], &[]),
        ArticleSource::Link => {
            let html = fetch(article.link.clone()).await?;
            extract_text(
                &html,
                &parse_tag_list(&feed.section_tags),
                &parse_tag_list(&feed.filter_tags),
            )
        }
    };
    if body.trim().is_empty() {
        return Err(AppError::Feed(format!(
            "No text extracted from '{}'",
            article.link
        )));
    }

    let text_id = TextRepository::create_parsed(
        &mut conn,
        &lang,
        &article.title,
        &body,
        Some(&article.link),
    )?;
    FeedRepository::mark_imported(&mut conn, article_id, text_id)?;
    log::info!("Imported article {} as text {}", article_id, text_id);
    Ok(Redirect::to(&format!("/texts/{}", text_id)))
}

async fn fetch(uri: String) -> Result<String, reqwest::Error> {
    reqwest::get(&uri).await?.error_for_status()?.text().await
}

pub fn router(pool: DbPool, tera: Arc<Tera>) -> Router {
    Router::new()
        .route("/", get(list_page))
        .route("/new", get(new_page).post(handle_create))
        .route("/refresh-due", post(handle_refresh_due))
        .route("/{id}/edit", get(edit_page).post(handle_update))
        .route("/{id}/delete", post(handle_delete))
        .route("/{id}/articles", get(articles_page))
        .route("/{id}/refresh", post(handle_refresh))
        .route("/{id}/articles/{article_id}/import", post(handle_import_article))
        .with_state((pool, tera))
}
