use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::{feed_articles, feeds};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = feeds)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Feed {
    pub feed_id: i32,
    pub lang_id: i32,
    pub feed_name: String,
    pub source_uri: String,
    pub section_tags: String,
    pub filter_tags: String,
    pub options: String,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = feeds)]
pub struct NewFeed<'a> {
    pub lang_id: i32,
    pub feed_name: &'a str,
    pub source_uri: &'a str,
    pub section_tags: &'a str,
    pub filter_tags: &'a str,
    pub options: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = feed_articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FeedArticle {
    pub article_id: i32,
    pub feed_id: i32,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: Option<NaiveDateTime>,
    pub text_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct FeedWithLanguage {
    pub feed_id: i32,
    pub feed_name: String,
    pub source_uri: String,
    pub options: String,
    pub lang_name: String,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeedForm {
    pub lang_id: i32,
    #[validate(length(min = 1, message = "Feed name is not set!"))]
    pub feed_name: String,
    #[validate(length(min = 1, message = "Feed URI is not set!"))]
    pub source_uri: String,
    #[serde(default)]
    pub section_tags: String,
    #[serde(default)]
    pub filter_tags: String,
    #[serde(default)]
    pub options: String,
}
