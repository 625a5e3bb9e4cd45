//! Catalog error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Credential rejected: {0}")]
    CredentialRejected(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
