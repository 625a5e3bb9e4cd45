//! Prometheus metrics for the tracker.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure means duplicate metric names, a fatal configuration error that
//! should crash at startup rather than fail silently. These panics only
//! occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge,
};

/// WebSocket connection state (1 = connected, 0 = disconnected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "kite_ws_connected",
        "WebSocket connection state (1=connected)"
    )
    .unwrap()
});

/// Total WebSocket reconnection attempts.
pub static WS_RECONNECT_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "kite_ws_reconnect_total",
        "Total WebSocket reconnection attempts"
    )
    .unwrap()
});

/// Total ticks decoded from the feed.
pub static TICKS_DECODED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("kite_ticks_decoded_total", "Total ticks decoded").unwrap()
});

/// Frame/packet decode failures.
/// Labels: reason (short_buffer/bad_length/zlib).
pub static DECODE_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kite_decode_errors_total",
        "Total frame decode failures",
        &["reason"]
    )
    .unwrap()
});

/// Alerts emitted.
/// Labels: kind (crash/spike/volume_spike).
pub static ALERTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("kite_alerts_total", "Total alerts emitted", &["kind"]).unwrap()
});

/// View pages published.
/// Labels: op (send/edit).
pub static PAGES_PUBLISHED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kite_pages_published_total",
        "Total view pages published",
        &["op"]
    )
    .unwrap()
});

/// Credential rotations.
/// Labels: outcome (completed/failed).
pub static ROTATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kite_rotations_total",
        "Total credential rotations",
        &["outcome"]
    )
    .unwrap()
});

/// Convenience facade over the metric statics.
pub struct Metrics;

impl Metrics {
    pub fn ws_connected(connected: bool) {
        WS_CONNECTED.set(if connected { 1.0 } else { 0.0 });
    }

    pub fn ws_reconnect() {
        WS_RECONNECT_TOTAL.inc();
    }

    pub fn ticks_decoded(count: u64) {
        TICKS_DECODED_TOTAL.inc_by(count as f64);
    }

    pub fn decode_error(reason: &str) {
        DECODE_ERRORS_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn alert(kind: &str) {
        ALERTS_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn page_published(op: &str) {
        PAGES_PUBLISHED_TOTAL.with_label_values(&[op]).inc();
    }

    pub fn rotation(outcome: &str) {
        ROTATIONS_TOTAL.with_label_values(&[outcome]).inc();
    }
}
