//! Timer-driven view publisher.
//!
//! Every period the publisher renders the snapshot into pages and pushes
//! them into the sink, creating a message per page on the first pass and
//! editing in place afterwards. A failed edit invalidates that page's
//! handle so the next cycle re-sends it.
//!
//! The loop awaits a full publish pass before polling the next timer
//! tick, so a late edit can never interleave with the following fire.

use crate::error::ViewResult;
use crate::render::{clamp_to_limit, render_page, HEADER_MARKER};
use chrono::Utc;
use kite_catalog::InstrumentCatalog;
use kite_core::{CivilZone, Token};
use kite_feed::SnapshotStore;
use kite_sink::{MessageHandle, MessageSink};
use kite_telemetry::Metrics;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Channel the tracker pages live in.
    pub channel_id: String,
    /// Maximum entries per page.
    pub page_size: usize,
    /// Publish period.
    pub period: Duration,
    /// Delay between the session reaching subscribed state and the first
    /// publish.
    pub initial_delay: Duration,
    /// Pause after each first-time send, easing sink rate limits.
    pub page_send_spacing: Duration,
    /// Adopt tracker messages left in the channel by a previous run.
    pub adopt_existing: bool,
    /// How many recent messages to scan when adopting.
    pub adopt_fetch_limit: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            channel_id: String::new(),
            page_size: 50,
            period: Duration::from_secs(3),
            initial_delay: Duration::from_secs(2),
            page_send_spacing: Duration::from_millis(200),
            adopt_existing: true,
            adopt_fetch_limit: 100,
        }
    }
}

/// Renders the snapshot into pages and keeps them updated in the sink.
pub struct ViewPublisher {
    config: ViewConfig,
    sink: Arc<dyn MessageSink>,
    catalog: Arc<InstrumentCatalog>,
    store: Arc<SnapshotStore>,
    /// View ordering: tokens in watchlist order, updated on add/remove.
    order: Arc<RwLock<Vec<Token>>>,
    zone: CivilZone,
    handles: Mutex<HashMap<usize, MessageHandle>>,
}

impl ViewPublisher {
    pub fn new(
        config: ViewConfig,
        sink: Arc<dyn MessageSink>,
        catalog: Arc<InstrumentCatalog>,
        store: Arc<SnapshotStore>,
        order: Arc<RwLock<Vec<Token>>>,
        zone: CivilZone,
    ) -> Self {
        Self {
            config,
            sink,
            catalog,
            store,
            order,
            zone,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Forget all page handles; the next cycle re-sends every page.
    /// Called by the rotation coordinator.
    pub fn clear_handles(&self) {
        self.handles.lock().clear();
    }

    pub fn handle_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Scan recent channel messages for tracker pages from a previous run
    /// and adopt them as page handles `0..k`, oldest first. Returns how
    /// many were adopted.
    pub async fn adopt_existing_handles(&self) -> ViewResult<usize> {
        let self_id = self.sink.self_id().await?;
        let mut messages = self
            .sink
            .fetch_recent(&self.config.channel_id, self.config.adopt_fetch_limit)
            .await?;

        messages.retain(|m| m.author_id == self_id && m.text.starts_with(HEADER_MARKER));
        messages.sort_by_key(|m| m.created_at);

        let mut handles = self.handles.lock();
        handles.clear();
        for (index, message) in messages.iter().enumerate() {
            handles.insert(index, message.handle.clone());
        }

        if !messages.is_empty() {
            info!(count = messages.len(), "Adopted existing tracker pages");
        }
        Ok(messages.len())
    }

    /// Render and publish one pass over the snapshot.
    pub async fn publish_once(&self) -> ViewResult<()> {
        let order = self.order.read().clone();
        let entries = self.store.snapshot_for_view(&order);
        if entries.is_empty() {
            debug!("No snapshot entries yet, skipping publish");
            return Ok(());
        }

        let ticks = self.store.ticks_applied();
        let now = Utc::now();
        let pages: Vec<_> = entries.chunks(self.config.page_size).collect();
        let page_count = pages.len();

        for (index, page) in pages.iter().enumerate() {
            let text = clamp_to_limit(render_page(
                page,
                index,
                page_count,
                index * self.config.page_size,
                entries.len(),
                ticks,
                now,
                &self.zone,
                &self.catalog,
            ));

            let existing = self.handles.lock().get(&index).cloned();
            match existing {
                Some(handle) => {
                    if let Err(e) = self
                        .sink
                        .edit(&self.config.channel_id, &handle, &text)
                        .await
                    {
                        warn!(%e, page = index, "Edit failed, invalidating handle");
                        self.handles.lock().remove(&index);
                    } else {
                        Metrics::page_published("edit");
                    }
                }
                None => match self.sink.send(&self.config.channel_id, &text).await {
                    Ok(handle) => {
                        self.handles.lock().insert(index, handle);
                        Metrics::page_published("send");
                        tokio::time::sleep(self.config.page_send_spacing).await;
                    }
                    Err(e) => {
                        warn!(%e, page = index, "Send failed");
                    }
                },
            }
        }

        Ok(())
    }

    /// Run the publish loop until cancelled.
    ///
    /// Waits for the feed session to report subscribed, optionally adopts
    /// pre-existing pages, then fires on a fixed period.
    pub async fn run(
        self: Arc<Self>,
        mut subscribed: watch::Receiver<bool>,
        cancel: CancellationToken,
    ) {
        // Wait for the session to reach subscribed state.
        while !*subscribed.borrow() {
            tokio::select! {
                _ = cancel.cancelled() => return,
                changed = subscribed.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        if self.config.adopt_existing {
            if let Err(e) = self.adopt_existing_handles().await {
                warn!(%e, "Handle adoption failed, starting fresh");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(self.config.initial_delay) => {}
        }

        let mut interval = tokio::time::interval(self.config.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            channel_id = %self.config.channel_id,
            period_ms = self.config.period.as_millis(),
            "View publisher started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.publish_once().await {
                        warn!(%e, "Publish cycle failed");
                    }
                }
            }
        }

        info!("View publisher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_core::{Instrument, Ohlc, Paise, Tick};
    use kite_sink::MemorySink;

    fn full_tick(token: u32, last: i64, close: i64, volume: u32) -> Tick {
        let mut tick = Tick::ltp(Token::new(token), Paise::from_raw(last));
        tick.volume_traded = volume;
        tick.ohlc = Some(Ohlc {
            open: Paise::from_raw(close),
            high: Paise::from_raw(last),
            low: Paise::from_raw(close),
            close: Paise::from_raw(close),
        });
        tick
    }

    struct Fixture {
        sink: Arc<MemorySink>,
        store: Arc<SnapshotStore>,
        publisher: ViewPublisher,
    }

    fn fixture(token_count: u32, page_size: usize) -> Fixture {
        let instruments: Vec<Instrument> = (1..=token_count)
            .map(|i| Instrument::new(Token::new(i), format!("SYM{i}"), format!("SYM{i}")))
            .collect();
        let catalog = Arc::new(InstrumentCatalog::new(instruments));
        let store = Arc::new(SnapshotStore::new());
        let order = Arc::new(RwLock::new(
            (1..=token_count).map(Token::new).collect::<Vec<_>>(),
        ));
        let sink = Arc::new(MemorySink::new());

        let config = ViewConfig {
            channel_id: "ticker".to_string(),
            page_size,
            page_send_spacing: Duration::from_millis(1),
            ..Default::default()
        };
        let publisher = ViewPublisher::new(
            config,
            sink.clone(),
            catalog,
            store.clone(),
            order,
            CivilZone::ist(),
        );
        Fixture {
            sink,
            store,
            publisher,
        }
    }

    #[tokio::test]
    async fn test_cold_start_publishes_one_page() {
        let f = fixture(2, 50);
        f.store.apply(&full_tick(1, 250000, 240000, 1_234_567));
        f.store.apply(&full_tick(2, 350000, 350000, 2_345_678));

        f.publisher.publish_once().await.unwrap();

        let messages = f.sink.messages("ticker");
        assert_eq!(messages.len(), 1);
        let text = &messages[0].text;
        assert!(text.starts_with("LIVE TRACKER 1/1 |"));
        assert!(text.contains("1.SYM1 : 2500.00 (+4.17%) {12.35L}"));
        assert!(text.contains("2.SYM2 : 3500.00 (+0.00%) {23.46L}"));
        assert!(text.contains("Total: 2 | Ticks: 2"));
    }

    #[tokio::test]
    async fn test_paging_three_pages_then_edits() {
        let f = fixture(120, 50);
        for i in 1..=120 {
            f.store.apply(&full_tick(i, 250000, 240000, 100_000));
        }

        f.publisher.publish_once().await.unwrap();
        assert_eq!(f.sink.send_count(), 3);
        assert_eq!(f.publisher.handle_count(), 3);

        let messages = f.sink.messages("ticker");
        assert!(messages[0].text.starts_with("LIVE TRACKER 1/3 |"));
        assert!(messages[1].text.starts_with("LIVE TRACKER 2/3 |"));
        assert!(messages[2].text.starts_with("LIVE TRACKER 3/3 |"));
        // 50/50/20 split: last page carries entries 101..120 and trailer.
        assert!(messages[2].text.contains("101.SYM101"));
        assert!(messages[2].text.contains("120.SYM120"));
        assert!(messages[2].text.contains("Total: 120 |"));
        assert!(!messages[1].text.contains("Total:"));

        // A second pass with no new ticks edits in place.
        f.publisher.publish_once().await.unwrap();
        assert_eq!(f.sink.send_count(), 3);
        assert_eq!(f.sink.edit_count(), 3);
    }

    #[tokio::test]
    async fn test_edit_failure_invalidates_handle() {
        let f = fixture(1, 50);
        f.store.apply(&full_tick(1, 250000, 240000, 0));

        f.publisher.publish_once().await.unwrap();
        assert_eq!(f.publisher.handle_count(), 1);

        f.sink.set_fail_edits(true);
        f.publisher.publish_once().await.unwrap();
        assert_eq!(f.publisher.handle_count(), 0);

        // Next cycle re-sends.
        f.sink.set_fail_edits(false);
        f.publisher.publish_once().await.unwrap();
        assert_eq!(f.sink.send_count(), 2);
        assert_eq!(f.publisher.handle_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_snapshot_publishes_nothing() {
        let f = fixture(2, 50);
        f.publisher.publish_once().await.unwrap();
        assert_eq!(f.sink.send_count(), 0);
    }

    #[tokio::test]
    async fn test_adopts_prior_tracker_pages_in_creation_order() {
        let f = fixture(2, 1);
        // Stale pages from a previous run, plus chatter from someone else.
        f.sink
            .seed_message("ticker", "memory-sink", "LIVE TRACKER 1/2 | 09:00:00 IST");
        f.sink
            .seed_message("ticker", "someone-else", "LIVE TRACKER 9/9 | bogus");
        f.sink.seed_message("ticker", "memory-sink", "unrelated note");
        f.sink
            .seed_message("ticker", "memory-sink", "LIVE TRACKER 2/2 | 09:00:00 IST");

        let adopted = f.publisher.adopt_existing_handles().await.unwrap();
        assert_eq!(adopted, 2);
        assert_eq!(f.publisher.handle_count(), 2);

        // Publishing two pages edits the adopted messages instead of
        // sending new ones.
        f.store.apply(&full_tick(1, 250000, 240000, 0));
        f.store.apply(&full_tick(2, 350000, 350000, 0));
        f.publisher.publish_once().await.unwrap();
        assert_eq!(f.sink.send_count(), 0);
        assert_eq!(f.sink.edit_count(), 2);

        let messages = f.sink.messages("ticker");
        assert!(messages[0].text.contains("1.SYM1"));
        assert!(messages[3].text.contains("2.SYM2"));
    }

    #[tokio::test]
    async fn test_clear_handles_forces_resend() {
        let f = fixture(1, 50);
        f.store.apply(&full_tick(1, 250000, 240000, 0));

        f.publisher.publish_once().await.unwrap();
        f.publisher.clear_handles();
        f.publisher.publish_once().await.unwrap();
        assert_eq!(f.sink.send_count(), 2);
        assert_eq!(f.sink.edit_count(), 0);
    }
}
