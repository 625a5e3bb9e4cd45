//! Rotation error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RotationError {
    #[error("Login failed: {0}")]
    Login(String),

    #[error("Login timed out")]
    LoginTimeout,

    #[error("Credential validation failed: {0}")]
    Validation(#[from] kite_catalog::CatalogError),

    #[error("Invalid rotation config: {0}")]
    InvalidConfig(String),
}

pub type RotationResult<T> = Result<T, RotationError>;
