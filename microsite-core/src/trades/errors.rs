//! Microsite error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MicrositeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Payload decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for MicrositeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type MicrositeResult<T> = Result<T, MicrositeError>;
