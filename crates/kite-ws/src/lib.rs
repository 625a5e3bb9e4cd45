//! WebSocket feed session for the broker's binary tick stream.
//!
//! Provides:
//! - Session state machine with fixed-interval reconnect and a retry cap
//! - Subscription control frames (subscribe / unsubscribe / mode)
//! - Frame ingest into the decoder and snapshot store
//! - Escalation signalling when retries are exhausted

pub mod control;
pub mod error;
pub mod session;

pub use control::{mode_message, subscribe_message, unsubscribe_message, SubscriptionMode};
pub use error::{SessionError, SessionResult};
pub use session::{FeedSession, SessionConfig, SessionState};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
