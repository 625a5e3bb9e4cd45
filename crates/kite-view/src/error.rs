//! View error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Sink error: {0}")]
    Sink(#[from] kite_sink::SinkError),
}

pub type ViewResult<T> = Result<T, ViewError>;
