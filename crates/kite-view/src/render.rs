//! Page rendering.
//!
//! A page is a pure function of the snapshot entries and wall-time:
//! header, one line per entry, trailer on the last page. Rendering the
//! same inputs always yields the same text, which is what makes in-place
//! edits diff cleanly.

use chrono::{DateTime, Utc};
use kite_catalog::InstrumentCatalog;
use kite_core::CivilZone;
use kite_feed::SnapshotEntry;
use kite_sink::MESSAGE_LIMIT;
use rust_decimal::{Decimal, RoundingStrategy};

/// Stable header prefix; also the marker used to recognize tracker pages
/// left in the channel by a previous run.
pub const HEADER_MARKER: &str = "LIVE TRACKER";

/// Longest rendered instrument name; longer names are cut so a full page
/// stays inside the sink message limit.
const NAME_WIDTH: usize = 18;

const LAKH: i64 = 100_000;

fn entry_line(global_index: usize, name: &str, entry: &SnapshotEntry) -> String {
    let name: String = name.chars().take(NAME_WIDTH).collect();

    let pct = entry
        .pct_change()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if pct.is_sign_negative() { "" } else { "+" };

    let volume_lakh = (Decimal::from(entry.volume) / Decimal::from(LAKH))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    format!(
        "{global_index}.{name} : {} ({sign}{pct:.2}%) {{{volume_lakh:.2}L}}",
        entry.last_price
    )
}

/// Render one page.
///
/// `entries` is this page's slice, `global_offset` the index of its first
/// entry across all pages (0-based; rendered indices are 1-based).
#[allow(clippy::too_many_arguments)]
pub fn render_page(
    entries: &[SnapshotEntry],
    page_index: usize,
    page_count: usize,
    global_offset: usize,
    total: usize,
    ticks: u64,
    now: DateTime<Utc>,
    zone: &CivilZone,
    catalog: &InstrumentCatalog,
) -> String {
    let local = zone.to_local(now);
    let mut text = format!(
        "{HEADER_MARKER} {}/{} | {} {}",
        page_index + 1,
        page_count,
        local.format("%H:%M:%S"),
        zone.label()
    );

    for (i, entry) in entries.iter().enumerate() {
        let name = catalog.display_name(entry.token);
        text.push('\n');
        text.push_str(&entry_line(global_offset + i + 1, &name, entry));
    }

    if page_index + 1 == page_count {
        text.push_str(&format!("\nTotal: {total} | Ticks: {ticks}"));
    }

    text
}

/// Cut whole lines from the end until the text fits the sink limit.
pub fn clamp_to_limit(text: String) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text;
    }
    let mut kept = String::new();
    for line in text.lines() {
        let with_line = kept.chars().count() + line.chars().count() + 1;
        if !kept.is_empty() && with_line > MESSAGE_LIMIT {
            break;
        }
        if !kept.is_empty() {
            kept.push('\n');
        }
        kept.push_str(line);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use kite_core::{Instrument, Ohlc, Paise, Tick, Token};
    use kite_feed::SnapshotStore;

    fn catalog() -> InstrumentCatalog {
        InstrumentCatalog::new(vec![
            Instrument::new(Token::new(738561), "RELIANCE", "RELIANCE"),
            Instrument::new(Token::new(2953217), "TCS", "TCS"),
        ])
    }

    fn entry(token: u32, last: i64, close: i64, volume: u32) -> SnapshotEntry {
        let store = SnapshotStore::new();
        let mut tick = Tick::ltp(Token::new(token), Paise::from_raw(last));
        tick.volume_traded = volume;
        tick.ohlc = Some(Ohlc {
            open: Paise::from_raw(close),
            high: Paise::from_raw(last),
            low: Paise::from_raw(close),
            close: Paise::from_raw(close),
        });
        store.apply(&tick);
        store.get(Token::new(token)).unwrap()
    }

    #[test]
    fn test_cold_start_page() {
        let entries = vec![
            entry(738561, 250000, 240000, 1_234_567),
            entry(2953217, 350000, 350000, 2_345_678),
        ];
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 3, 45, 2).unwrap();

        let text = render_page(
            &entries,
            0,
            1,
            0,
            2,
            2,
            now,
            &CivilZone::ist(),
            &catalog(),
        );

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "LIVE TRACKER 1/1 | 09:15:02 IST");
        assert_eq!(lines[1], "1.RELIANCE : 2500.00 (+4.17%) {12.35L}");
        assert_eq!(lines[2], "2.TCS : 3500.00 (+0.00%) {23.46L}");
        assert_eq!(lines[3], "Total: 2 | Ticks: 2");
    }

    #[test]
    fn test_trailer_only_on_last_page() {
        let entries = vec![entry(738561, 250000, 240000, 0)];
        let now = Utc::now();
        let zone = CivilZone::ist();
        let catalog = catalog();

        let first = render_page(&entries, 0, 3, 0, 120, 9, now, &zone, &catalog);
        assert!(!first.contains("Total:"));

        let last = render_page(&entries, 2, 3, 100, 120, 9, now, &zone, &catalog);
        assert!(last.contains("Total: 120 | Ticks: 9"));
        assert!(last.starts_with("LIVE TRACKER 3/3 |"));
    }

    #[test]
    fn test_global_indices_continue_across_pages() {
        let entries = vec![entry(738561, 250000, 240000, 0)];
        let now = Utc::now();
        let text = render_page(
            &entries,
            1,
            2,
            50,
            51,
            1,
            now,
            &CivilZone::ist(),
            &catalog(),
        );
        assert!(text.contains("51.RELIANCE"));
    }

    #[test]
    fn test_long_names_truncated() {
        let catalog = InstrumentCatalog::new(vec![Instrument::new(
            Token::new(1),
            "VERYLONGSYMBOL",
            "AN EXCESSIVELY LONG COMPANY NAME LTD",
        )]);
        let entries = vec![entry(1, 100, 100, 0)];
        let text = render_page(
            &entries,
            0,
            1,
            0,
            1,
            1,
            Utc::now(),
            &CivilZone::ist(),
            &catalog,
        );
        assert!(text.contains("1.AN EXCESSIVELY LON :"));
    }

    #[test]
    fn test_full_page_fits_sink_limit() {
        let instruments: Vec<Instrument> = (0..50)
            .map(|i| Instrument::new(Token::new(i), format!("SYM{i}"), format!("SYM{i}")))
            .collect();
        let catalog = InstrumentCatalog::new(instruments);
        let entries: Vec<SnapshotEntry> =
            (0..50).map(|i| entry(i, 250000, 240000, 1_234_567)).collect();

        let text = render_page(
            &entries,
            0,
            1,
            0,
            50,
            1_000_000,
            Utc::now(),
            &CivilZone::ist(),
            &catalog,
        );
        assert!(text.chars().count() <= MESSAGE_LIMIT);
    }

    #[test]
    fn test_oversized_page_clamps_within_limit() {
        // Max-width names and eight-digit prices push a 50-entry page past
        // the limit; the clamp must bring it back under.
        let instruments: Vec<Instrument> = (0..50)
            .map(|i| {
                Instrument::new(Token::new(i), format!("SYM{i}"), "X".repeat(NAME_WIDTH + 10))
            })
            .collect();
        let catalog = InstrumentCatalog::new(instruments);
        let entries: Vec<SnapshotEntry> = (0..50)
            .map(|i| entry(i, 12_345_678, 12_000_000, 4_000_000_000))
            .collect();

        let text = render_page(
            &entries,
            0,
            1,
            0,
            50,
            1,
            Utc::now(),
            &CivilZone::ist(),
            &catalog,
        );
        let clamped = clamp_to_limit(text);
        assert!(clamped.chars().count() <= MESSAGE_LIMIT);
        assert!(clamped.starts_with(HEADER_MARKER));
    }

    #[test]
    fn test_clamp_cuts_whole_lines() {
        let long_line = "y".repeat(30);
        let mut text = String::new();
        for _ in 0..100 {
            text.push_str(&long_line);
            text.push('\n');
        }
        let clamped = clamp_to_limit(text);
        assert!(clamped.chars().count() <= MESSAGE_LIMIT);
        for line in clamped.lines() {
            assert_eq!(line.chars().count(), 30);
        }
    }
}
