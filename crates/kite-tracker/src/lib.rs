//! Composition root for the Kite market tracker.

pub mod app;
pub mod config;
pub mod error;
pub mod login_cmd;

pub use app::Application;
pub use config::{AppConfig, Secrets, TradingMode};
pub use error::{AppError, AppResult};
pub use login_cmd::CommandLoginProvider;
