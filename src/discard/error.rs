use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscardError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DiscardResult<T> = Result<T, DiscardError>;
