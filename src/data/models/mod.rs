pub mod error_models;
pub mod forms;
pub mod feed_models;
pub mod language_models;
pub mod review_models;
pub mod tag_models;
pub mod text_models;
pub mod word_models;

pub use error_models::AppError;
pub use feed_models::{Feed, FeedArticle, FeedForm, FeedWithLanguage, NewFeed};
pub use language_models::{Language, LanguageForm, NewLanguage};
pub use review_models::{AnswerRequest, AnswerResponse, ReviewFilter, ReviewTerm};
pub use tag_models::{NewTag, Tag, TagForm, TagWithCount};
pub use text_models::{
    LongImportForm, NewSentence, NewText, NewTextItem, ReadingToken, Text, TextForm,
    TextListEntry, TextQuery,
};
pub use word_models::{ApiResponse, NewWord, SimilarParams, UploadForm, Word, WordForm, WordQuery};
