//! Periodic snapshot views published into the chat sink.

pub mod error;
pub mod publisher;
pub mod render;

pub use error::{ViewError, ViewResult};
pub use publisher::{ViewConfig, ViewPublisher};
pub use render::{clamp_to_limit, render_page, HEADER_MARKER};
