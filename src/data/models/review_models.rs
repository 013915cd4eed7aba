use serde::{Deserialize, Serialize};

/// Selection filters for a review session.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewFilter {
    pub lang: i32,
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub text: Option<i32>,
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub status_min: Option<i32>,
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub status_max: Option<i32>,
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub tag: Option<i32>,
    #[serde(default, deserialize_with = "crate::data::models::forms::empty_string_as_none")]
    pub count: Option<usize>,
}

/// A term served during a review session; the solution side is rendered
/// hidden by the template.
#[derive(Debug, Serialize)]
pub struct ReviewTerm {
    pub word_id: i32,
    pub word: String,
    pub status: i32,
    pub translation: String,
    pub romanization: String,
    pub sentence: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// +1, -1, 98 or 99.
    pub grade: i32,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub word_id: i32,
    pub status: i32,
}
