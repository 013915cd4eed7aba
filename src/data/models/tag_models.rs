use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::tags;

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Tag {
    pub tag_id: i32,
    pub tag_name: String,
    pub comment: String,
}

#[derive(Insertable)]
#[diesel(table_name = tags)]
pub struct NewTag<'a> {
    pub tag_name: &'a str,
    pub comment: &'a str,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TagForm {
    #[validate(length(min = 1, message = "Tag name is not set!"))]
    pub tag_name: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct TagWithCount {
    pub tag_id: i32,
    pub tag_name: String,
    pub comment: String,
    pub term_count: i64,
}
