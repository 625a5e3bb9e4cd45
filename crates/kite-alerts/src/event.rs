//! Typed alert events.

use chrono::Duration;
use kite_core::{Paise, Token};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Crash,
    Spike,
    VolumeSpike,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crash => "crash",
            Self::Spike => "spike",
            Self::VolumeSpike => "volume_spike",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One threshold crossing.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub token: Token,
    pub price: Paise,
    /// Percent price change over the delta.
    pub pct: Decimal,
    /// Volume ratio, present for volume spikes.
    pub ratio: Option<Decimal>,
    /// Time between the two observations.
    pub elapsed: Duration,
}

impl AlertEvent {
    /// One-line sink message, e.g.
    /// `CRASH RELIANCE : 2400.00 (-4.00% in 60s)`.
    pub fn format(&self, name: &str) -> String {
        let secs = self.elapsed.num_seconds();
        let pct = self
            .pct
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        match self.kind {
            AlertKind::Crash => format!("🔻 CRASH {name} : {} ({pct:.2}% in {secs}s)", self.price),
            AlertKind::Spike => format!("🔺 SPIKE {name} : {} (+{pct:.2}% in {secs}s)", self.price),
            AlertKind::VolumeSpike => {
                let ratio = self
                    .ratio
                    .unwrap_or_default()
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                format!("📊 VOLUME {name} : {} (x{ratio:.2} in {secs}s)", self.price)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_crash_format() {
        let event = AlertEvent {
            kind: AlertKind::Crash,
            token: Token::new(738561),
            price: Paise::from_raw(240000),
            pct: dec!(-4),
            ratio: None,
            elapsed: Duration::seconds(60),
        };
        assert_eq!(
            event.format("RELIANCE"),
            "🔻 CRASH RELIANCE : 2400.00 (-4.00% in 60s)"
        );
    }

    #[test]
    fn test_volume_format() {
        let event = AlertEvent {
            kind: AlertKind::VolumeSpike,
            token: Token::new(738561),
            price: Paise::from_raw(250000),
            pct: Decimal::ZERO,
            ratio: Some(dec!(3)),
            elapsed: Duration::seconds(10),
        };
        assert_eq!(
            event.format("RELIANCE"),
            "📊 VOLUME RELIANCE : 2500.00 (x3.00 in 10s)"
        );
    }
}
