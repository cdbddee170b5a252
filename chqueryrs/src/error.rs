use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChQueryError>;

#[derive(Debug, Error)]
pub enum ChQueryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
