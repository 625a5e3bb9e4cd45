//! Alert engine configuration.

use crate::error::{AlertError, AlertResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Thresholds for the alert rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Delta window in seconds; pairs further apart never alert.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Percent drop that triggers a CRASH alert.
    #[serde(default = "default_price_pct")]
    pub crash_pct: Decimal,
    /// Percent rise that triggers a SPIKE alert.
    #[serde(default = "default_price_pct")]
    pub spike_pct: Decimal,
    /// Volume ratio (new/old) that triggers a VOLUME_SPIKE alert.
    #[serde(default = "default_volume_ratio")]
    pub volume_ratio: Decimal,
    /// Apply the delta window to the volume rule as well. Without the gate
    /// a cumulative volume counter diffed across an arbitrarily old entry
    /// fires on every tick of a liquid instrument.
    #[serde(default = "default_true")]
    pub gate_volume_by_window: bool,
}

fn default_window_secs() -> u64 {
    300
}

fn default_price_pct() -> Decimal {
    Decimal::from(3)
}

fn default_volume_ratio() -> Decimal {
    Decimal::from(2)
}

fn default_true() -> bool {
    true
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            crash_pct: default_price_pct(),
            spike_pct: default_price_pct(),
            volume_ratio: default_volume_ratio(),
            gate_volume_by_window: true,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> AlertResult<()> {
        if self.window_secs == 0 {
            return Err(AlertError::InvalidConfig(
                "window_secs must be positive".to_string(),
            ));
        }
        if self.crash_pct <= Decimal::ZERO || self.spike_pct <= Decimal::ZERO {
            return Err(AlertError::InvalidConfig(
                "price thresholds must be positive".to_string(),
            ));
        }
        if self.volume_ratio <= Decimal::ONE {
            return Err(AlertError::InvalidConfig(
                "volume_ratio must exceed 1".to_string(),
            ));
        }
        Ok(())
    }
}
