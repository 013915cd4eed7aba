use anyhow::Context as _;
use axum::{routing::get_service, Router};
use diesel::{
    connection::SimpleConnection,
    r2d2::{ConnectionManager, Pool},
    SqliteConnection,
};
use std::sync::Arc;
use tera::Tera;
use time::Duration;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

mod data;
mod features;
mod handlers;
mod schema;
mod utils;

type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration comes from the environment
    dotenv::dotenv().ok();
    env_logger::init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "lexiread.db".into());
    let manager = ConnectionManager::<SqliteConnection>::new(&database_url);
    let pool = Pool::builder()
        .build(manager)
        .context("Failed to create DB pool")?;

    // Missing tables are created on startup
    {
        let mut conn = pool.get().context("Failed to get DB connection")?;
        conn.batch_execute(include_str!("../migrations/schema.sql"))
            .context("Schema setup failed")?;
    }

    // Templates configuration
    let templates = Tera::new("templates/**/*.html").context("Template parsing error")?;
    let templates = Arc::new(templates);

    // Sessions configuration
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(1)))
        .with_secure(false);

    // JSON API used by the reading view and the review session
    let api_router = Router::new()
        .nest(
            "/words",
            handlers::words::api_router(pool.clone(), templates.clone()),
        )
        .nest(
            "/review",
            handlers::review::api_router(pool.clone(), templates.clone()),
        );

    // Main application router
    let app = Router::new()
        .merge(handlers::pages::router(pool.clone(), templates.clone()))
        .nest(
            "/languages",
            handlers::languages::router(pool.clone(), templates.clone()),
        )
        .nest(
            "/texts",
            handlers::texts::router(pool.clone(), templates.clone()),
        )
        .nest(
            "/words",
            handlers::words::router(pool.clone(), templates.clone()),
        )
        .nest(
            "/tags",
            handlers::tags::router(pool.clone(), templates.clone()),
        )
        .nest(
            "/feeds",
            handlers::feeds::router(pool.clone(), templates.clone()),
        )
        .nest(
            "/review",
            handlers::review::router(pool.clone(), templates.clone()),
        )
        .nest(
            "/settings",
            handlers::settings::router(pool.clone(), templates.clone()),
        )
        .nest("/api", api_router)
        .nest_service("/static", get_service(ServeDir::new("static")))
        .layer(session_layer);

    // Start server
    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".into());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    log::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
