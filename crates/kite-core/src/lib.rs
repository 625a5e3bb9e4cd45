//! Core domain types for the Kite market tracker.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Token`: exchange-assigned instrument identifier
//! - `Paise`: fixed-point price in integer hundredths of a rupee
//! - `Instrument`: catalog entry mapping token to trading symbol
//! - `Tick`, `TickMode`, `Ohlc`, `MarketDepth`: decoded market data

pub mod credentials;
pub mod error;
pub mod instrument;
pub mod price;
pub mod tick;
pub mod zone;

pub use credentials::Credentials;
pub use error::{CoreError, Result};
pub use instrument::{Instrument, Token};
pub use price::Paise;
pub use tick::{DepthLevel, MarketDepth, Ohlc, Tick, TickMode};
pub use zone::CivilZone;
