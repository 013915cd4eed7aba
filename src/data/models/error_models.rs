use diesel::result::Error as DieselError;
use thiserror::Error;
use validator::ValidationErrors;

// One taxonomy for every handler; rendering lives in features::errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(DieselError),
    #[error("Database connection error: {0}")]
    Pool(String),
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
    #[error("Session error: {0}")]
    Session(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Duplicate {0}")]
    Duplicate(&'static str),
    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Feed error: {0}")]
    Feed(String),
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound("record"),
            other => AppError::Database(other),
        }
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Pool(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AppError::Session(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<quick_xml::Error> for AppError {
    fn from(err: quick_xml::Error) -> Self {
        AppError::Feed(err.to_string())
    }
}
