use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

use crate::constants::booking_hold;

/// A single instant seen from the venues' local timezone.
///
/// Services take this explicitly so that every decision in one request or
/// sweep uses the same "now".
#[derive(Debug, Clone, Copy)]
pub struct VenueClock {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl VenueClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    /// Clock for `now` with an offset given in minutes east of UTC.
    /// Offsets outside ±24h fall back to UTC.
    pub fn with_offset_minutes(now: DateTime<Utc>, offset_minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| Utc.fix());
        Self::new(now, offset)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn local_now(&self) -> NaiveDateTime {
        self.now.with_timezone(&self.offset).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.local_now().date()
    }

    /// Holds created at or before this instant have lapsed.
    pub fn hold_cutoff(&self) -> DateTime<Utc> {
        self.now - booking_hold()
    }
}
