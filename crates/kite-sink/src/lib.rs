//! Chat message sink abstraction.
//!
//! The tracker only needs four capabilities from the chat platform: send a
//! message, edit it in place, list recent channel messages, and know its
//! own author id. `MessageSink` captures exactly that; `DiscordSink` is the
//! live implementation and `MemorySink` the in-memory fake used by tests
//! and paper mode.

pub mod discord;
pub mod error;
pub mod memory;

pub use discord::DiscordSink;
pub use error::{SinkError, SinkResult};
pub use memory::MemorySink;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Maximum rendered size of a single message, in code points.
pub const MESSAGE_LIMIT: usize = 2000;

/// Opaque reference to a previously sent message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub String);

impl MessageHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// One message as returned by `fetch_recent`.
#[derive(Debug, Clone)]
pub struct SinkMessage {
    pub handle: MessageHandle,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
}

/// Capability surface over the chat platform.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Send a message, returning a handle usable for later edits.
    async fn send(&self, channel_id: &str, text: &str) -> SinkResult<MessageHandle>;

    /// Edit a previously sent message in place.
    async fn edit(&self, channel_id: &str, handle: &MessageHandle, text: &str) -> SinkResult<()>;

    /// Most recent messages in a channel, newest first.
    async fn fetch_recent(&self, channel_id: &str, limit: usize) -> SinkResult<Vec<SinkMessage>>;

    /// The author id this sink publishes under.
    async fn self_id(&self) -> SinkResult<String>;
}
