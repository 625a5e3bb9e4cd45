//! Alert rule evaluation.
//!
//! Rules run independently over each snapshot delta, so one delta can
//! produce several alerts. Evaluation is pure; delivery lives in
//! `delivery.rs`.

use crate::config::AlertConfig;
use crate::error::AlertResult;
use crate::event::{AlertEvent, AlertKind};
use chrono::Duration;
use kite_feed::SnapshotDelta;
use rust_decimal::Decimal;

pub struct AlertEngine {
    config: AlertConfig,
}

impl AlertEngine {
    pub fn new(config: AlertConfig) -> AlertResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Evaluate every rule against one delta. Events come back in rule
    /// order (crash, spike, volume) and are delivered in that order.
    pub fn evaluate(&self, delta: &SnapshotDelta) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        let elapsed = delta.new.observed_at - delta.old.observed_at;
        let within_window = elapsed <= Duration::seconds(self.config.window_secs as i64);

        let pct = delta
            .new
            .last_price
            .pct_from(delta.old.last_price)
            .unwrap_or(Decimal::ZERO);

        if within_window && pct <= -self.config.crash_pct {
            events.push(AlertEvent {
                kind: AlertKind::Crash,
                token: delta.new.token,
                price: delta.new.last_price,
                pct,
                ratio: None,
                elapsed,
            });
        }

        if within_window && pct >= self.config.spike_pct {
            events.push(AlertEvent {
                kind: AlertKind::Spike,
                token: delta.new.token,
                price: delta.new.last_price,
                pct,
                ratio: None,
                elapsed,
            });
        }

        if delta.old.volume > 0 && (within_window || !self.config.gate_volume_by_window) {
            let ratio = Decimal::from(delta.new.volume) / Decimal::from(delta.old.volume);
            if ratio >= self.config.volume_ratio {
                events.push(AlertEvent {
                    kind: AlertKind::VolumeSpike,
                    token: delta.new.token,
                    price: delta.new.last_price,
                    pct,
                    ratio: Some(ratio),
                    elapsed,
                });
            }
        }

        events
    }
}
