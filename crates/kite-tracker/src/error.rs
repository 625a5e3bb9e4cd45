//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] kite_core::CoreError),

    #[error("Session error: {0}")]
    Session(#[from] kite_ws::SessionError),

    #[error("Alert error: {0}")]
    Alert(#[from] kite_alerts::AlertError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] kite_catalog::CatalogError),

    #[error("Watchlist error: {0}")]
    Watchlist(#[from] kite_watchlist::WatchlistError),

    #[error("Sink error: {0}")]
    Sink(#[from] kite_sink::SinkError),

    #[error("View error: {0}")]
    View(#[from] kite_view::ViewError),

    #[error("Rotation error: {0}")]
    Rotation(#[from] kite_rotator::RotationError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] kite_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
