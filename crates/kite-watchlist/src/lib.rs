//! Tracked-instrument registry, persisted as a flat JSON array.

pub mod error;
pub mod registry;
pub mod store;

pub use error::{WatchlistError, WatchlistResult};
pub use registry::Watchlist;
pub use store::WatchlistStore;
