//! Live snapshot store.
//!
//! Keyed state for each tracked instrument: `current` holds the most recent
//! entry per token, `previous` the penultimate one. The previous shadow is
//! what the alert engine diffs against.
//!
//! Writers (the feed ingest path) and readers (the view publisher timer)
//! are serialized through one coarse mutex; neither side can observe a torn
//! entry, and the view always sees a consistent cross-token cut.

use chrono::{DateTime, Utc};
use kite_core::{MarketDepth, Ohlc, Paise, Tick, Token};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Most recent decoded state for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub token: Token,
    pub last_price: Paise,
    pub volume: u32,
    pub buy_qty: u32,
    pub sell_qty: u32,
    pub avg_price: Paise,
    pub last_qty: u32,
    pub ohlc: Option<Ohlc>,
    pub depth: Option<MarketDepth>,
    pub observed_at: DateTime<Utc>,
}

impl SnapshotEntry {
    fn from_tick(tick: &Tick, observed_at: DateTime<Utc>) -> Self {
        Self {
            token: tick.token,
            last_price: tick.last_price,
            volume: tick.volume_traded,
            buy_qty: tick.total_buy_qty,
            sell_qty: tick.total_sell_qty,
            avg_price: tick.avg_traded_price,
            last_qty: tick.last_traded_qty,
            ohlc: tick.ohlc,
            depth: tick.depth.clone(),
            observed_at,
        }
    }

    /// Net change vs session close; zero before OHLC arrives.
    pub fn change(&self) -> Paise {
        self.ohlc
            .map(|o| self.last_price - o.close)
            .unwrap_or(Paise::ZERO)
    }

    /// Percent change vs session close; zero when close is unknown or zero.
    pub fn pct_change(&self) -> Decimal {
        self.ohlc
            .and_then(|o| self.last_price.pct_from(o.close))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Old/new entry pair produced when a token already had state.
#[derive(Debug, Clone)]
pub struct SnapshotDelta {
    pub old: SnapshotEntry,
    pub new: SnapshotEntry,
}

#[derive(Default)]
struct Inner {
    current: HashMap<Token, SnapshotEntry>,
    previous: HashMap<Token, SnapshotEntry>,
}

/// Keyed live state for tracked instruments.
pub struct SnapshotStore {
    inner: Mutex<Inner>,
    ticks_applied: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ticks_applied: AtomicU64::new(0),
        }
    }

    /// Apply a tick, stamping observation time now.
    ///
    /// Returns the delta against the prior entry when one existed. Repeated
    /// applies for one token within a single ingest pass each observe the
    /// prior `current` as `old`.
    pub fn apply(&self, tick: &Tick) -> Option<SnapshotDelta> {
        self.apply_at(tick, Utc::now())
    }

    /// Apply with an explicit observation time.
    pub fn apply_at(&self, tick: &Tick, observed_at: DateTime<Utc>) -> Option<SnapshotDelta> {
        let entry = SnapshotEntry::from_tick(tick, observed_at);
        self.ticks_applied.fetch_add(1, Ordering::Relaxed);

        let mut inner = self.inner.lock();
        match inner.current.insert(tick.token, entry.clone()) {
            Some(old) => {
                inner.previous.insert(tick.token, old.clone());
                Some(SnapshotDelta { old, new: entry })
            }
            None => None,
        }
    }

    /// Entries in the given order, skipping tokens with no data yet.
    pub fn snapshot_for_view(&self, order: &[Token]) -> Vec<SnapshotEntry> {
        let inner = self.inner.lock();
        order
            .iter()
            .filter_map(|token| inner.current.get(token).cloned())
            .collect()
    }

    pub fn get(&self, token: Token) -> Option<SnapshotEntry> {
        self.inner.lock().current.get(&token).cloned()
    }

    pub fn previous(&self, token: Token) -> Option<SnapshotEntry> {
        self.inner.lock().previous.get(&token).cloned()
    }

    pub fn size(&self) -> usize {
        self.inner.lock().current.len()
    }

    /// Ticks applied since construction or the last `clear`.
    pub fn ticks_applied(&self) -> u64 {
        self.ticks_applied.load(Ordering::Relaxed)
    }

    /// Drop state for one token (unsubscribe path).
    pub fn purge(&self, token: Token) {
        let mut inner = self.inner.lock();
        inner.current.remove(&token);
        inner.previous.remove(&token);
    }

    /// Drop all state; used on pipeline restart.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.current.clear();
        inner.previous.clear();
        self.ticks_applied.store(0, Ordering::Relaxed);
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
