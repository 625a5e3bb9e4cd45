//! Synthetic binary frames for the mock feed.

use byteorder::{BigEndian, WriteBytesExt};

/// 184-byte FULL packet with the documented field offsets.
pub fn full_packet(token: u32, last_price: u32, close: u32, volume: u32) -> Vec<u8> {
    let mut pkt = Vec::with_capacity(184);
    pkt.write_u32::<BigEndian>(token).unwrap();
    pkt.write_u32::<BigEndian>(last_price).unwrap();
    pkt.write_u32::<BigEndian>(10).unwrap(); // last_traded_qty
    pkt.write_u32::<BigEndian>(last_price).unwrap(); // avg_traded_price
    pkt.write_u32::<BigEndian>(volume).unwrap();
    pkt.write_u32::<BigEndian>(500).unwrap(); // total_buy_qty
    pkt.write_u32::<BigEndian>(600).unwrap(); // total_sell_qty
    pkt.write_u32::<BigEndian>(close).unwrap(); // open
    pkt.write_u32::<BigEndian>(last_price).unwrap(); // high
    pkt.write_u32::<BigEndian>(close).unwrap(); // low
    pkt.write_u32::<BigEndian>(close).unwrap(); // close
    pkt.write_u32::<BigEndian>(1_700_000_000).unwrap(); // last_trade_time
    pkt.write_u32::<BigEndian>(0).unwrap(); // oi
    pkt.write_u32::<BigEndian>(0).unwrap(); // oi_day_high
    pkt.write_u32::<BigEndian>(0).unwrap(); // oi_day_low
    pkt.write_u32::<BigEndian>(1_700_000_001).unwrap(); // exchange_timestamp
    for i in 0..10u32 {
        pkt.write_u32::<BigEndian>(100 + i).unwrap();
        pkt.write_u32::<BigEndian>(last_price).unwrap();
        pkt.write_u16::<BigEndian>(2).unwrap();
        pkt.write_u16::<BigEndian>(0).unwrap();
    }
    assert_eq!(pkt.len(), 184);
    pkt
}

/// Wrap packets into one wire frame.
pub fn frame(packets: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_u16::<BigEndian>(packets.len() as u16).unwrap();
    for pkt in packets {
        buf.write_u16::<BigEndian>(pkt.len() as u16).unwrap();
        buf.extend_from_slice(pkt);
    }
    buf
}
