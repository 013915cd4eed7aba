use axum::response::Html;
use tera::{Context, Tera};

pub mod session;

pub use session::{
    clear_current_lang, current_lang_id, current_text_id, set_current_lang, set_current_text,
};

pub fn render_template(tera: &Tera, template_name: &str, context: Context) -> Html<String> {
    Html(tera.render(template_name, &context).unwrap_or_else(|e| {
        log::error!("Template rendering failed for {}: {}", template_name, e);
        format!("Error rendering template: {}", template_name)
    }))
}
