//! Alert error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Invalid alert config: {0}")]
    InvalidConfig(String),
}

pub type AlertResult<T> = Result<T, AlertError>;
