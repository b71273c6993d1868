use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("NewsAPI error: {0}")]
    NewsApi(String),

    #[error("Claude API error: {0}")]
    ClaudeApi(String),

    #[error("extraction failed: {0}")]
    Extract(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<tokio_rusqlite::Error> for AppError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => AppError::Database(e),
            // Errors raised inside a `call` closure come back boxed; recover
            // the original variant so callers can still match on it.
            tokio_rusqlite::Error::Other(e) => match e.downcast::<AppError>() {
                Ok(app) => *app,
                Err(e) => AppError::Store(e.to_string()),
            },
            other => AppError::Store(other.to_string()),
        }
    }
}
