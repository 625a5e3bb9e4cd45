//! Application configuration.
//!
//! Structure comes from a TOML file; secrets come from the environment.

use crate::error::{AppError, AppResult};
use kite_alerts::AlertConfig;
use kite_core::CivilZone;
use kite_rotator::RotatorConfig;
use kite_view::ViewConfig;
use kite_ws::{SessionConfig, SubscriptionMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// WebSocket feed endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Broker REST endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Exchange segment for the instrument catalog.
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Watchlist file; point at a mounted volume in deployment.
    #[serde(default = "default_watchlist_path")]
    pub watchlist_path: String,
    #[serde(default)]
    pub zone: ZoneSettings,
    #[serde(default)]
    pub websocket: WsSettings,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub view: ViewSettings,
    #[serde(default)]
    pub rotation: RotationSettings,
}

fn default_ws_url() -> String {
    "wss://ws.kite.trade".to_string()
}

fn default_api_url() -> String {
    "https://api.kite.trade".to_string()
}

fn default_exchange() -> String {
    "NSE".to_string()
}

fn default_watchlist_path() -> String {
    "subscriptions.json".to_string()
}

/// Civil time zone for schedules and rendered timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSettings {
    pub offset_minutes: i32,
    pub label: String,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            offset_minutes: 330,
            label: "IST".to_string(),
        }
    }
}

impl ZoneSettings {
    pub fn civil_zone(&self) -> AppResult<CivilZone> {
        CivilZone::new(self.offset_minutes, &self.label).map_err(AppError::Core)
    }
}

/// WebSocket session subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsSettings {
    #[serde(default)]
    pub mode: SubscriptionMode,
    pub connect_timeout_secs: u64,
    pub reconnect_interval_secs: u64,
    pub max_reconnect_attempts: u32,
    pub mode_set_delay_ms: u64,
    pub confirm_grace_secs: u64,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            mode: SubscriptionMode::Full,
            connect_timeout_secs: 10,
            reconnect_interval_secs: 5,
            max_reconnect_attempts: 10,
            mode_set_delay_ms: 1000,
            confirm_grace_secs: 60,
        }
    }
}

impl From<WsSettings> for SessionConfig {
    fn from(cfg: WsSettings) -> Self {
        Self {
            ws_url: String::new(), // set separately
            mode: cfg.mode,
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            reconnect_interval: Duration::from_secs(cfg.reconnect_interval_secs),
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            mode_set_delay: Duration::from_millis(cfg.mode_set_delay_ms),
            confirm_grace: Duration::from_secs(cfg.confirm_grace_secs),
        }
    }
}

/// View publisher subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSettings {
    pub page_size: usize,
    pub period_secs: u64,
    pub initial_delay_secs: u64,
    pub page_send_spacing_ms: u64,
    pub adopt_existing: bool,
    pub adopt_fetch_limit: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            period_secs: 3,
            initial_delay_secs: 2,
            page_send_spacing_ms: 200,
            adopt_existing: true,
            adopt_fetch_limit: 100,
        }
    }
}

impl From<ViewSettings> for ViewConfig {
    fn from(cfg: ViewSettings) -> Self {
        Self {
            channel_id: String::new(), // set separately
            page_size: cfg.page_size,
            period: Duration::from_secs(cfg.period_secs),
            initial_delay: Duration::from_secs(cfg.initial_delay_secs),
            page_send_spacing: Duration::from_millis(cfg.page_send_spacing_ms),
            adopt_existing: cfg.adopt_existing,
            adopt_fetch_limit: cfg.adopt_fetch_limit,
        }
    }
}

/// Rotation subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationSettings {
    pub hour: u32,
    pub minute: u32,
    pub login_timeout_secs: u64,
    pub restart_delay_secs: u64,
    /// Shell command that performs the broker login and prints the fresh
    /// access token on stdout.
    pub login_command: String,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            hour: 5,
            minute: 45,
            login_timeout_secs: 120,
            restart_delay_secs: 2,
            login_command: "kite-login".to_string(),
        }
    }
}

impl From<RotationSettings> for RotatorConfig {
    fn from(cfg: RotationSettings) -> Self {
        Self {
            rotate_hour: cfg.hour,
            rotate_minute: cfg.minute,
            login_timeout: Duration::from_secs(cfg.login_timeout_secs),
            restart_delay: Duration::from_secs(cfg.restart_delay_secs),
            audit_channel_id: String::new(), // set separately
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            api_url: default_api_url(),
            exchange: default_exchange(),
            watchlist_path: default_watchlist_path(),
            zone: ZoneSettings::default(),
            websocket: WsSettings::default(),
            alerts: AlertConfig::default(),
            view: ViewSettings::default(),
            rotation: RotationSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from the given path, the `KITE_TRACKER_CONFIG` env var, or
    /// `config/default.toml`; missing file falls back to defaults.
    pub fn load(path: Option<String>) -> AppResult<Self> {
        let config_path = path
            .or_else(|| std::env::var("KITE_TRACKER_CONFIG").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}

/// Whether the tracker publishes to the live chat platform or an
/// in-memory sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradingMode {
    #[default]
    Live,
    Paper,
}

/// Secrets sourced from the environment, never from the config file.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub api_key: String,
    pub access_token: String,
    pub discord_bot_token: String,
    pub log_channel_id: String,
    pub ticker_channel_id: String,
    pub trading_mode: TradingMode,
}

fn required_env(name: &str) -> AppResult<String> {
    std::env::var(name).map_err(|_| AppError::Config(format!("{name} is not set")))
}

impl Secrets {
    pub fn from_env() -> AppResult<Self> {
        let trading_mode = match std::env::var("TRADING_MODE") {
            Ok(v) if v.eq_ignore_ascii_case("paper") => TradingMode::Paper,
            _ => TradingMode::Live,
        };

        let (discord_bot_token, log_channel_id, ticker_channel_id) = match trading_mode {
            TradingMode::Live => (
                required_env("DISCORD_BOT_TOKEN")?,
                required_env("DISCORD_LOG_CHANNEL_ID")?,
                required_env("DISCORD_TICKER_CHANNEL_ID")?,
            ),
            TradingMode::Paper => (
                std::env::var("DISCORD_BOT_TOKEN").unwrap_or_default(),
                std::env::var("DISCORD_LOG_CHANNEL_ID").unwrap_or_else(|_| "log".to_string()),
                std::env::var("DISCORD_TICKER_CHANNEL_ID")
                    .unwrap_or_else(|_| "ticker".to_string()),
            ),
        };

        Ok(Self {
            api_key: required_env("ZERODHA_API_KEY")?,
            access_token: required_env("ZERODHA_ACCESS_TOKEN")?,
            discord_bot_token,
            log_channel_id,
            ticker_channel_id,
            trading_mode,
        })
    }
}
