//! Core error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid time zone offset: {0} minutes")]
    InvalidTimeZoneOffset(i32),
}

pub type Result<T> = std::result::Result<T, CoreError>;
