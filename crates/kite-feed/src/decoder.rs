//! Binary tick decoder.
//!
//! Parses broker frames into zero or more `Tick` records. The decoder is
//! referentially transparent: identical input bytes always produce identical
//! tick sequences. It never reads the clock.
//!
//! Frame classification, checked in order:
//! 1. one byte `0x00` -> heartbeat
//! 2. leading `{` -> JSON control frame (falls through on parse failure)
//! 3. zlib magic `78 9C|01|DA` -> inflate, then treat as binary
//! 4. otherwise -> binary frame

use byteorder::{BigEndian, ByteOrder};
use flate2::read::ZlibDecoder;
use kite_core::{DepthLevel, MarketDepth, Ohlc, Paise, Tick, TickMode, Token};
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Number of depth levels on each side of a FULL packet.
const DEPTH_LEVELS: usize = 5;
/// Bytes per depth level: u32 qty, u32 price, u16 orders, u16 padding.
const DEPTH_LEVEL_LEN: usize = 12;
/// Offset of the depth block inside a FULL packet.
const DEPTH_OFFSET: usize = 64;

/// Classified result of decoding one transport frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
    /// One-byte keepalive from the server.
    Heartbeat,
    /// JSON text frame, typically `{"type":"error","data":...}`.
    TextControl(serde_json::Value),
    /// Binary market data.
    Data(Vec<Tick>),
    /// Undecodable frame, discarded.
    Unknown,
}

/// Decode counters, updated atomically so callers can sample them from
/// any task.
#[derive(Debug, Default)]
pub struct DecodeStats {
    pub frames: AtomicU64,
    pub packets: AtomicU64,
    pub heartbeats: AtomicU64,
    pub short_buffers: AtomicU64,
    pub bad_lengths: AtomicU64,
    pub zlib_failures: AtomicU64,
}

impl DecodeStats {
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::Relaxed)
    }

    pub fn short_buffers(&self) -> u64 {
        self.short_buffers.load(Ordering::Relaxed)
    }

    pub fn bad_lengths(&self) -> u64 {
        self.bad_lengths.load(Ordering::Relaxed)
    }

    pub fn zlib_failures(&self) -> u64 {
        self.zlib_failures.load(Ordering::Relaxed)
    }
}

/// Binary frame decoder.
pub struct TickDecoder {
    stats: DecodeStats,
}

impl TickDecoder {
    pub fn new() -> Self {
        Self {
            stats: DecodeStats::default(),
        }
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Decode one transport frame.
    pub fn decode_frame(&self, buf: &[u8]) -> DecodedFrame {
        self.stats.frames.fetch_add(1, Ordering::Relaxed);

        if buf.len() == 1 && buf[0] == 0x00 {
            self.stats.heartbeats.fetch_add(1, Ordering::Relaxed);
            return DecodedFrame::Heartbeat;
        }

        if buf.first() == Some(&b'{') {
            if let Ok(text) = std::str::from_utf8(buf) {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
                    debug!(?value, "Text control frame");
                    return DecodedFrame::TextControl(value);
                }
            }
            // Not valid JSON after all; treat as binary below.
        }

        if buf.len() >= 2 && buf[0] == 0x78 && matches!(buf[1], 0x9C | 0x01 | 0xDA) {
            let mut inflated = Vec::new();
            match ZlibDecoder::new(buf).read_to_end(&mut inflated) {
                Ok(_) => return DecodedFrame::Data(self.decode_binary(&inflated)),
                Err(e) => {
                    self.stats.zlib_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(?e, len = buf.len(), "Discarding undecompressable frame");
                    return DecodedFrame::Unknown;
                }
            }
        }

        DecodedFrame::Data(self.decode_binary(buf))
    }

    /// Decode the packets of a binary frame.
    ///
    /// Layout (big-endian): `u16 count`, then `count` x (`u16 len` + packet).
    /// A short buffer halts iteration and returns the ticks decoded so far.
    fn decode_binary(&self, buf: &[u8]) -> Vec<Tick> {
        if buf.is_empty() {
            return Vec::new();
        }
        if buf.len() < 2 {
            self.stats.short_buffers.fetch_add(1, Ordering::Relaxed);
            return Vec::new();
        }

        let count = BigEndian::read_u16(&buf[0..2]) as usize;
        let mut ticks = Vec::with_capacity(count);
        let mut offset = 2;

        for _ in 0..count {
            if buf.len() < offset + 2 {
                self.stats.short_buffers.fetch_add(1, Ordering::Relaxed);
                break;
            }
            let len = BigEndian::read_u16(&buf[offset..offset + 2]) as usize;
            offset += 2;

            if buf.len() < offset + len {
                self.stats.short_buffers.fetch_add(1, Ordering::Relaxed);
                break;
            }
            if let Some(tick) = self.decode_packet(&buf[offset..offset + len]) {
                ticks.push(tick);
            }
            offset += len;
        }

        self.stats
            .packets
            .fetch_add(ticks.len() as u64, Ordering::Relaxed);
        ticks
    }

    /// Decode one packet. Mode is derived from the packet length; packets
    /// with a length the wire format does not produce are skipped.
    fn decode_packet(&self, pkt: &[u8]) -> Option<Tick> {
        let mode = match TickMode::from_packet_len(pkt.len()) {
            Some(mode) => mode,
            None => {
                self.stats.bad_lengths.fetch_add(1, Ordering::Relaxed);
                debug!(len = pkt.len(), "Skipping packet with unexpected length");
                return None;
            }
        };

        let token = Token::new(BigEndian::read_u32(&pkt[0..4]));
        let last_price = Paise::from_wire(BigEndian::read_u32(&pkt[4..8]));
        let mut tick = Tick::ltp(token, last_price);
        tick.mode = mode;

        match mode {
            TickMode::Ltp => {}
            TickMode::IndexQuote => {
                // Index packets order the session prices high/low/open/close
                // and append a precomputed change we re-derive from close.
                tick.ohlc = Some(Ohlc {
                    high: Paise::from_wire(BigEndian::read_u32(&pkt[8..12])),
                    low: Paise::from_wire(BigEndian::read_u32(&pkt[12..16])),
                    open: Paise::from_wire(BigEndian::read_u32(&pkt[16..20])),
                    close: Paise::from_wire(BigEndian::read_u32(&pkt[20..24])),
                });
            }
            TickMode::Quote | TickMode::Full => {
                tick.last_traded_qty = BigEndian::read_u32(&pkt[8..12]);
                tick.avg_traded_price = Paise::from_wire(BigEndian::read_u32(&pkt[12..16]));
                tick.volume_traded = BigEndian::read_u32(&pkt[16..20]);
                tick.total_buy_qty = BigEndian::read_u32(&pkt[20..24]);
                tick.total_sell_qty = BigEndian::read_u32(&pkt[24..28]);
                tick.ohlc = Some(Ohlc {
                    open: Paise::from_wire(BigEndian::read_u32(&pkt[28..32])),
                    high: Paise::from_wire(BigEndian::read_u32(&pkt[32..36])),
                    low: Paise::from_wire(BigEndian::read_u32(&pkt[36..40])),
                    close: Paise::from_wire(BigEndian::read_u32(&pkt[40..44])),
                });

                if mode == TickMode::Full {
                    tick.last_trade_time = Some(BigEndian::read_u32(&pkt[44..48]));
                    tick.oi = Some(BigEndian::read_u32(&pkt[48..52]));
                    tick.oi_day_high = Some(BigEndian::read_u32(&pkt[52..56]));
                    tick.oi_day_low = Some(BigEndian::read_u32(&pkt[56..60]));
                    tick.exchange_timestamp = Some(BigEndian::read_u32(&pkt[60..64]));
                    tick.depth = Some(decode_depth(&pkt[DEPTH_OFFSET..]));
                }
            }
        }

        Some(tick)
    }
}

impl Default for TickDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the 5+5 depth block of a FULL packet.
fn decode_depth(buf: &[u8]) -> MarketDepth {
    let mut depth = MarketDepth::default();
    for i in 0..DEPTH_LEVELS * 2 {
        let at = i * DEPTH_LEVEL_LEN;
        let level = DepthLevel {
            qty: BigEndian::read_u32(&buf[at..at + 4]),
            price: Paise::from_wire(BigEndian::read_u32(&buf[at + 4..at + 8])),
            orders: BigEndian::read_u16(&buf[at + 8..at + 10]),
        };
        if i < DEPTH_LEVELS {
            depth.buy.push(level);
        } else {
            depth.sell.push(level);
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn ltp_packet(token: u32, price: u32) -> Vec<u8> {
        let mut pkt = Vec::new();
        pkt.write_u32::<BigEndian>(token).unwrap();
        pkt.write_u32::<BigEndian>(price).unwrap();
        pkt
    }

    fn quote_packet(token: u32, price: u32, volume: u32, close: u32) -> Vec<u8> {
        let mut pkt = ltp_packet(token, price);
        pkt.write_u32::<BigEndian>(10).unwrap(); // last_traded_qty
        pkt.write_u32::<BigEndian>(price).unwrap(); // avg_traded_price
        pkt.write_u32::<BigEndian>(volume).unwrap();
        pkt.write_u32::<BigEndian>(500).unwrap(); // total_buy_qty
        pkt.write_u32::<BigEndian>(600).unwrap(); // total_sell_qty
        pkt.write_u32::<BigEndian>(close + 100).unwrap(); // open
        pkt.write_u32::<BigEndian>(price + 200).unwrap(); // high
        pkt.write_u32::<BigEndian>(close - 300).unwrap(); // low
        pkt.write_u32::<BigEndian>(close).unwrap();
        pkt
    }

    fn full_packet(token: u32, price: u32, volume: u32, close: u32) -> Vec<u8> {
        let mut pkt = quote_packet(token, price, volume, close);
        pkt.write_u32::<BigEndian>(1_700_000_000).unwrap(); // last_trade_time
        pkt.write_u32::<BigEndian>(0).unwrap(); // oi
        pkt.write_u32::<BigEndian>(0).unwrap(); // oi_day_high
        pkt.write_u32::<BigEndian>(0).unwrap(); // oi_day_low
        pkt.write_u32::<BigEndian>(1_700_000_001).unwrap(); // exchange_timestamp
        for i in 0..10u32 {
            pkt.write_u32::<BigEndian>(100 + i).unwrap(); // qty
            pkt.write_u32::<BigEndian>(price - 50 + i).unwrap(); // price
            pkt.write_u16::<BigEndian>(3).unwrap(); // orders
            pkt.write_u16::<BigEndian>(0).unwrap(); // padding
        }
        assert_eq!(pkt.len(), 184);
        pkt
    }

    fn frame(packets: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u16::<BigEndian>(packets.len() as u16).unwrap();
        for pkt in packets {
            buf.write_u16::<BigEndian>(pkt.len() as u16).unwrap();
            buf.extend_from_slice(pkt);
        }
        buf
    }

    #[test]
    fn test_heartbeat() {
        let decoder = TickDecoder::new();
        assert_eq!(decoder.decode_frame(&[0x00]), DecodedFrame::Heartbeat);
        assert_eq!(decoder.stats().heartbeats(), 1);
    }

    #[test]
    fn test_text_control() {
        let decoder = TickDecoder::new();
        let frame = br#"{"type":"error","data":"token expired"}"#;
        match decoder.decode_frame(frame) {
            DecodedFrame::TextControl(value) => {
                assert_eq!(value["type"], "error");
            }
            other => panic!("Expected TextControl, got {other:?}"),
        }
    }

    #[test]
    fn test_ltp_packet_decodes_price_only() {
        let decoder = TickDecoder::new();
        let buf = frame(&[ltp_packet(738561, 250000)]);

        let ticks = match decoder.decode_frame(&buf) {
            DecodedFrame::Data(ticks) => ticks,
            other => panic!("Expected Data, got {other:?}"),
        };
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].mode, TickMode::Ltp);
        assert_eq!(ticks[0].token, Token::new(738561));
        assert_eq!(ticks[0].last_price, Paise::from_raw(250000));
        assert!(ticks[0].ohlc.is_none());
        assert!(ticks[0].depth.is_none());
    }

    #[test]
    fn test_quote_packet_no_depth() {
        let decoder = TickDecoder::new();
        let buf = frame(&[quote_packet(738561, 250000, 1_000_000, 240000)]);

        let ticks = match decoder.decode_frame(&buf) {
            DecodedFrame::Data(ticks) => ticks,
            other => panic!("Expected Data, got {other:?}"),
        };
        assert_eq!(ticks.len(), 1);
        let tick = &ticks[0];
        assert_eq!(tick.mode, TickMode::Quote);
        assert_eq!(tick.volume_traded, 1_000_000);
        assert_eq!(tick.ohlc.unwrap().close, Paise::from_raw(240000));
        assert_eq!(tick.change(), Some(Paise::from_raw(10000)));
        assert!(tick.depth.is_none());
    }

    #[test]
    fn test_full_packet_round_trip() {
        let decoder = TickDecoder::new();
        let buf = frame(&[full_packet(738561, 250000, 1_000_000, 240000)]);

        let ticks = match decoder.decode_frame(&buf) {
            DecodedFrame::Data(ticks) => ticks,
            other => panic!("Expected Data, got {other:?}"),
        };
        assert_eq!(ticks.len(), 1);
        let tick = &ticks[0];
        assert_eq!(tick.mode, TickMode::Full);
        assert_eq!(tick.token, Token::new(738561));
        assert_eq!(tick.last_price, Paise::from_raw(250000));
        assert_eq!(tick.volume_traded, 1_000_000);
        assert_eq!(tick.exchange_timestamp, Some(1_700_000_001));

        let depth = tick.depth.as_ref().unwrap();
        assert_eq!(depth.buy.len(), 5);
        assert_eq!(depth.sell.len(), 5);
        assert_eq!(depth.buy[0].qty, 100);
        assert_eq!(depth.buy[0].orders, 3);
        assert_eq!(depth.sell[0].qty, 105);
        assert_eq!(depth.sell[4].price, Paise::from_raw(249_959));
    }

    #[test]
    fn test_multi_packet_frame_preserves_wire_order() {
        let decoder = TickDecoder::new();
        let buf = frame(&[
            ltp_packet(1, 100),
            ltp_packet(2, 200),
            ltp_packet(3, 300),
        ]);

        let ticks = match decoder.decode_frame(&buf) {
            DecodedFrame::Data(ticks) => ticks,
            other => panic!("Expected Data, got {other:?}"),
        };
        let tokens: Vec<u32> = ticks.iter().map(|t| t.token.raw()).collect();
        assert_eq!(tokens, vec![1, 2, 3]);
    }

    #[test]
    fn test_truncated_frame_partial_decode() {
        let decoder = TickDecoder::new();
        let mut buf = frame(&[ltp_packet(1, 100), ltp_packet(2, 200)]);
        buf.truncate(buf.len() - 3); // cut into the second packet

        let ticks = match decoder.decode_frame(&buf) {
            DecodedFrame::Data(ticks) => ticks,
            other => panic!("Expected Data, got {other:?}"),
        };
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].token, Token::new(1));
        assert_eq!(decoder.stats().short_buffers(), 1);
    }

    #[test]
    fn test_empty_frame_zero_ticks() {
        let decoder = TickDecoder::new();
        assert_eq!(decoder.decode_frame(&[]), DecodedFrame::Data(Vec::new()));
    }

    #[test]
    fn test_bad_length_packet_skipped() {
        let decoder = TickDecoder::new();
        // 12-byte packet: not a length the wire format produces.
        let bad = vec![0u8; 12];
        let buf = frame(&[bad, ltp_packet(7, 700)]);

        let ticks = match decoder.decode_frame(&buf) {
            DecodedFrame::Data(ticks) => ticks,
            other => panic!("Expected Data, got {other:?}"),
        };
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].token, Token::new(7));
        assert_eq!(decoder.stats().bad_lengths(), 1);
    }

    #[test]
    fn test_zlib_frame_inflates_to_binary() {
        let decoder = TickDecoder::new();
        let inner = frame(&[ltp_packet(42, 4200)]);
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&inner).unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(compressed[0], 0x78);

        let ticks = match decoder.decode_frame(&compressed) {
            DecodedFrame::Data(ticks) => ticks,
            other => panic!("Expected Data, got {other:?}"),
        };
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].token, Token::new(42));
    }

    #[test]
    fn test_zlib_garbage_discarded() {
        let decoder = TickDecoder::new();
        let garbage = vec![0x78, 0x9C, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(decoder.decode_frame(&garbage), DecodedFrame::Unknown);
        assert_eq!(decoder.stats().zlib_failures(), 1);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let decoder = TickDecoder::new();
        let buf = frame(&[
            full_packet(738561, 250000, 1_000_000, 240000),
            quote_packet(2953217, 350000, 2_000_000, 350000),
        ]);

        let first = decoder.decode_frame(&buf);
        let second = decoder.decode_frame(&buf);
        assert_eq!(first, second);
    }
}
