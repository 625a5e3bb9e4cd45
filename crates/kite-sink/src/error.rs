//! Sink error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API rejected request: {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Message not found: {0}")]
    NotFound(String),

    #[error("Message exceeds size limit: {0} code points")]
    TooLarge(usize),
}

pub type SinkResult<T> = Result<T, SinkError>;
