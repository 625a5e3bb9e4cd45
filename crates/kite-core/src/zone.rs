//! Civil time zone handling.
//!
//! The deployment zone (IST) is a fixed UTC offset with no daylight
//! saving, so a `FixedOffset` plus a display label is exact.

use crate::error::{CoreError, Result};
use chrono::{DateTime, FixedOffset, Utc};

#[derive(Debug, Clone)]
pub struct CivilZone {
    offset: FixedOffset,
    label: String,
}

impl CivilZone {
    pub fn new(offset_minutes: i32, label: impl Into<String>) -> Result<Self> {
        let offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or(CoreError::InvalidTimeZoneOffset(offset_minutes))?;
        Ok(Self {
            offset,
            label: label.into(),
        })
    }

    /// Indian Standard Time, UTC+05:30.
    pub fn ist() -> Self {
        Self::new(330, "IST").expect("IST offset is valid")
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn to_local(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset)
    }

    pub fn now_local(&self) -> DateTime<FixedOffset> {
        self.to_local(Utc::now())
    }
}
