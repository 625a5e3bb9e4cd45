//! Watchlist error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Already tracked: {0}")]
    AlreadyTracked(String),

    #[error("Not tracked: {0}")]
    NotTracked(String),
}

pub type WatchlistResult<T> = Result<T, WatchlistError>;
