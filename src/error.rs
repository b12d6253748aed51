// src/error.rs
use thiserror::Error;

pub type BoardResult<T> = Result<T, BoardError>;

/// Failure of a call into one of the backing services.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("supabase error: {0}")]
    Supabase(String),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("other: {0}")]
    Other(String),
}

/// Why `submit_post` refused or failed. Validation misses are not errors.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("sign in before writing a post")]
    NotAuthenticated,
    #[error("a submission is already in progress")]
    InFlight,
    #[error("image upload failed: {0}")]
    Upload(#[source] BoardError),
    #[error("saving the post failed: {0}")]
    Write(#[source] BoardError),
}
