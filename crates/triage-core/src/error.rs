use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}

pub type Result<T> = std::result::Result<T, TriageError>;
