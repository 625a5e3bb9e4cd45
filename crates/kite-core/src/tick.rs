//! Decoded market-data records.

use crate::instrument::Token;
use crate::price::Paise;
use serde::{Deserialize, Serialize};

/// Which fields a binary packet carries, derived from its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickMode {
    /// Last traded price only (8-byte packet).
    Ltp,
    /// Index packet with OHLC and precomputed change (28 bytes).
    IndexQuote,
    /// Quote fields without depth (44 bytes).
    Quote,
    /// Quote fields plus OI, timestamps and 5+5 depth levels (>= 184 bytes).
    Full,
}

impl TickMode {
    /// Classify a packet by length. Returns `None` for lengths the wire
    /// format does not produce.
    pub fn from_packet_len(len: usize) -> Option<Self> {
        match len {
            8 => Some(Self::Ltp),
            28 => Some(Self::IndexQuote),
            n if n >= 184 => Some(Self::Full),
            n if n >= 44 => Some(Self::Quote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ltp => "ltp",
            Self::IndexQuote => "index_quote",
            Self::Quote => "quote",
            Self::Full => "full",
        }
    }
}

/// Session open/high/low/close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: Paise,
    pub high: Paise,
    pub low: Paise,
    pub close: Paise,
}

/// One bid or ask level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DepthLevel {
    pub qty: u32,
    pub price: Paise,
    pub orders: u16,
}

/// Five bid and five ask levels, best first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketDepth {
    pub buy: Vec<DepthLevel>,
    pub sell: Vec<DepthLevel>,
}

/// One decoded market-data record for one instrument.
///
/// Carries no wall-time: identical wire bytes always decode to identical
/// ticks. The snapshot store stamps observation time on apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub token: Token,
    pub mode: TickMode,
    pub last_price: Paise,
    pub last_traded_qty: u32,
    pub avg_traded_price: Paise,
    pub volume_traded: u32,
    pub total_buy_qty: u32,
    pub total_sell_qty: u32,
    pub ohlc: Option<Ohlc>,
    pub last_trade_time: Option<u32>,
    pub oi: Option<u32>,
    pub oi_day_high: Option<u32>,
    pub oi_day_low: Option<u32>,
    pub exchange_timestamp: Option<u32>,
    pub depth: Option<MarketDepth>,
}

impl Tick {
    /// An LTP-only tick; richer modes fill the remaining fields in place.
    pub fn ltp(token: Token, last_price: Paise) -> Self {
        Self {
            token,
            mode: TickMode::Ltp,
            last_price,
            last_traded_qty: 0,
            avg_traded_price: Paise::ZERO,
            volume_traded: 0,
            total_buy_qty: 0,
            total_sell_qty: 0,
            ohlc: None,
            last_trade_time: None,
            oi: None,
            oi_day_high: None,
            oi_day_low: None,
            exchange_timestamp: None,
            depth: None,
        }
    }

    /// Net change vs session close, when OHLC is known.
    pub fn change(&self) -> Option<Paise> {
        self.ohlc.map(|o| self.last_price - o.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_packet_len() {
        assert_eq!(TickMode::from_packet_len(8), Some(TickMode::Ltp));
        assert_eq!(TickMode::from_packet_len(28), Some(TickMode::IndexQuote));
        assert_eq!(TickMode::from_packet_len(44), Some(TickMode::Quote));
        assert_eq!(TickMode::from_packet_len(64), Some(TickMode::Quote));
        assert_eq!(TickMode::from_packet_len(184), Some(TickMode::Full));
        assert_eq!(TickMode::from_packet_len(492), Some(TickMode::Full));
        assert_eq!(TickMode::from_packet_len(12), None);
        assert_eq!(TickMode::from_packet_len(0), None);
    }

    #[test]
    fn test_change_requires_ohlc() {
        let mut tick = Tick::ltp(Token::new(1), Paise::from_raw(250000));
        assert!(tick.change().is_none());

        tick.ohlc = Some(Ohlc {
            open: Paise::from_raw(240000),
            high: Paise::from_raw(251000),
            low: Paise::from_raw(239000),
            close: Paise::from_raw(240000),
        });
        assert_eq!(tick.change(), Some(Paise::from_raw(10000)));
    }
}
