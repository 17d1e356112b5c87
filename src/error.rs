//! Error types for the feed service and the feed client
//!
//! - `FeedError`: server-side query errors, mapped to HTTP responses in `routes`
//! - `ClientError`: client-side fetch errors, reported by the controller

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request was rejected, returned a non-2xx status, or carried an
    /// unreadable or unsuccessful body.
    #[error("network failure: {0}")]
    NetworkFailure(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::NetworkFailure(err.to_string())
    }
}
