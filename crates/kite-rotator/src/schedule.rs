//! Rotation schedule arithmetic.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use kite_core::CivilZone;
use std::time::Duration;

/// Next wall-clock occurrence of `hour:minute` in the given zone, strictly
/// after `after`.
pub fn next_rotation(
    after: DateTime<Utc>,
    zone: &CivilZone,
    hour: u32,
    minute: u32,
) -> DateTime<Utc> {
    let local = zone.to_local(after);
    let today = local
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| local.date_naive().and_hms_opt(0, 0, 0).expect("midnight"));

    // A fixed offset maps every local time to exactly one instant.
    let mut target = match zone.offset().from_local_datetime(&today).single() {
        Some(target) => target,
        None => return after + ChronoDuration::days(1),
    };

    if target <= local {
        target = target + ChronoDuration::days(1);
    }

    target.with_timezone(&Utc)
}

/// Sleep duration until the next rotation boundary.
pub fn until_next_rotation(
    now: DateTime<Utc>,
    zone: &CivilZone,
    hour: u32,
    minute: u32,
) -> Duration {
    (next_rotation(now, zone, hour, minute) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}
