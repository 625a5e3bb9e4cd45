//! In-memory sink for tests and paper mode.

use crate::error::{SinkError, SinkResult};
use crate::{MessageHandle, MessageSink, SinkMessage, MESSAGE_LIMIT};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
struct ChannelLog {
    messages: Vec<SinkMessage>,
    by_handle: HashMap<MessageHandle, usize>,
}

/// Records every send and edit; can be told to fail edits to exercise
/// handle-invalidation paths.
pub struct MemorySink {
    channels: Mutex<HashMap<String, ChannelLog>>,
    next_id: AtomicU64,
    fail_edits: AtomicBool,
    send_count: AtomicU64,
    edit_count: AtomicU64,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            fail_edits: AtomicBool::new(false),
            send_count: AtomicU64::new(0),
            edit_count: AtomicU64::new(0),
        }
    }

    /// Make subsequent `edit` calls fail.
    pub fn set_fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::Relaxed);
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::Relaxed)
    }

    pub fn edit_count(&self) -> u64 {
        self.edit_count.load(Ordering::Relaxed)
    }

    /// All messages in a channel, oldest first, current text.
    pub fn messages(&self, channel_id: &str) -> Vec<SinkMessage> {
        self.channels
            .lock()
            .get(channel_id)
            .map(|log| log.messages.clone())
            .unwrap_or_default()
    }

    /// Pre-seed a message, e.g. a stale tracker page from a prior run.
    pub fn seed_message(&self, channel_id: &str, author_id: &str, text: &str) -> MessageHandle {
        let handle = MessageHandle::new(
            self.next_id.fetch_add(1, Ordering::Relaxed).to_string(),
        );
        let mut channels = self.channels.lock();
        let log = channels.entry(channel_id.to_string()).or_default();
        log.by_handle.insert(handle.clone(), log.messages.len());
        log.messages.push(SinkMessage {
            handle: handle.clone(),
            author_id: author_id.to_string(),
            created_at: Utc::now(),
            text: text.to_string(),
        });
        handle
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&self, channel_id: &str, text: &str) -> SinkResult<MessageHandle> {
        let len = text.chars().count();
        if len > MESSAGE_LIMIT {
            return Err(SinkError::TooLarge(len));
        }
        self.send_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.seed_message(channel_id, "memory-sink", text))
    }

    async fn edit(&self, channel_id: &str, handle: &MessageHandle, text: &str) -> SinkResult<()> {
        let len = text.chars().count();
        if len > MESSAGE_LIMIT {
            return Err(SinkError::TooLarge(len));
        }
        if self.fail_edits.load(Ordering::Relaxed) {
            return Err(SinkError::Api {
                status: 500,
                body: "edit failure injected".to_string(),
            });
        }

        let mut channels = self.channels.lock();
        let log = channels
            .get_mut(channel_id)
            .ok_or_else(|| SinkError::NotFound(channel_id.to_string()))?;
        let index = *log
            .by_handle
            .get(handle)
            .ok_or_else(|| SinkError::NotFound(handle.0.clone()))?;

        self.edit_count.fetch_add(1, Ordering::Relaxed);
        log.messages[index].text = text.to_string();
        Ok(())
    }

    async fn fetch_recent(&self, channel_id: &str, limit: usize) -> SinkResult<Vec<SinkMessage>> {
        let channels = self.channels.lock();
        let mut messages = channels
            .get(channel_id)
            .map(|log| log.messages.clone())
            .unwrap_or_default();
        messages.reverse(); // newest first, like the live API
        messages.truncate(limit);
        Ok(messages)
    }

    async fn self_id(&self) -> SinkResult<String> {
        Ok("memory-sink".to_string())
    }
}
