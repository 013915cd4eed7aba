use tower_sessions::Session;

// The session replaces the original's global state: the language and text the
// user is currently working with.
const LANG_KEY: &str = "current_lang_id";
const TEXT_KEY: &str = "current_text_id";

pub async fn set_current_lang(session: &Session, lang_id: i32) {
    if let Err(e) = session.insert(LANG_KEY, lang_id).await {
        log::error!("Failed to store current language in session: {}", e);
    }
}

pub async fn current_lang_id(session: &Session) -> Option<i32> {
    match session.get::<i32>(LANG_KEY).await {
        Ok(lang_id) => lang_id,
        Err(e) => {
            log::error!("Failed to read current language from session: {}", e);
            None
        }
    }
}

pub async fn clear_current_lang(session: &Session) {
    if let Err(e) = session.remove::<i32>(LANG_KEY).await {
        log::warn!("Failed to clear current language from session: {}", e);
    }
}

pub async fn set_current_text(session: &Session, text_id: i32) {
    if let Err(e) = session.insert(TEXT_KEY, text_id).await {
        log::error!("Failed to store current text in session: {}", e);
    }
}

pub async fn current_text_id(session: &Session) -> Option<i32> {
    match session.get::<i32>(TEXT_KEY).await {
        Ok(text_id) => text_id,
        Err(e) => {
            log::error!("Failed to read current text from session: {}", e);
            None
        }
    }
}
