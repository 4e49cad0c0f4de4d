//! Slot grid arithmetic and occupancy over half-open `[start, end)` windows.
//!
//! Times are minutes since local midnight. Nothing here touches the database.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use infra::models::{OccupancyRow, PlaceRow};
use std::fmt;

/// Per-place parameters a single admission decision needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingParams {
    pub open_minute: u32,
    pub close_minute: u32,
    pub slot_interval_minutes: u32,
    pub capacity: i32,
    pub min_slot_count: u32,
    pub max_slot_count: u32,
    pub min_interval_days: i64,
    pub max_interval_days: i64,
}

impl SchedulingParams {
    pub fn from_place(place: &PlaceRow) -> Self {
        let non_negative = |v: i32| u32::try_from(v).unwrap_or(0);
        Self {
            open_minute: non_negative(place.open_hour) * 60,
            close_minute: non_negative(place.close_hour) * 60,
            slot_interval_minutes: non_negative(place.slot_interval_minutes).max(1),
            capacity: place.capacity,
            min_slot_count: non_negative(place.min_slot_count),
            max_slot_count: non_negative(place.max_slot_count),
            min_interval_days: i64::from(place.min_interval_days),
            max_interval_days: i64::from(place.max_interval_days),
        }
    }

    /// Start minute of every slot that fits before closing.
    pub fn slot_starts(&self) -> Vec<u32> {
        let step = self.slot_interval_minutes as usize;
        (self.open_minute..self.close_minute)
            .step_by(step)
            .filter(|start| start + self.slot_interval_minutes <= self.close_minute)
            .collect()
    }

    /// Every grid-aligned window made of exactly `slot_count` slots.
    pub fn windows_of(&self, slot_count: u32) -> Vec<Window> {
        let length = slot_count * self.slot_interval_minutes;
        if length == 0 {
            return Vec::new();
        }
        self.slot_starts()
            .into_iter()
            .map(|start| Window::new(start, start + length))
            .filter(|w| w.end <= self.close_minute)
            .collect()
    }

    /// Inclusive range of dates that may be booked on `today`.
    /// Ends beyond the calendar clamp to `NaiveDate::MIN`/`MAX`.
    pub fn booking_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (
            shift_days(today, self.min_interval_days),
            shift_days(today, self.max_interval_days),
        )
    }

    /// Check window shape against the grid; returns its slot count.
    pub fn validate_window(&self, window: Window) -> Result<u32, WindowError> {
        if window.end <= window.start {
            return Err(WindowError::Empty);
        }
        if window.start < self.open_minute || window.end > self.close_minute {
            return Err(WindowError::OutsideOpeningHours {
                open: self.open_minute,
                close: self.close_minute,
            });
        }
        let interval = self.slot_interval_minutes;
        if (window.start - self.open_minute) % interval != 0 || window.len() % interval != 0 {
            return Err(WindowError::Misaligned { interval });
        }

        let slot_count = window.len() / interval;
        if slot_count < self.min_slot_count || slot_count > self.max_slot_count {
            return Err(WindowError::SlotCount {
                min: self.min_slot_count,
                max: self.max_slot_count,
                requested: slot_count,
            });
        }
        Ok(slot_count)
    }

    pub fn validate_date(&self, date: NaiveDate, today: NaiveDate) -> Result<(), WindowError> {
        let (earliest, latest) = self.booking_range(today);
        if date < earliest || date > latest {
            return Err(WindowError::DateOutOfRange { earliest, latest });
        }
        Ok(())
    }

    pub fn validate_headcount(&self, headcount: i32) -> Result<(), WindowError> {
        if headcount < 1 || headcount > self.capacity {
            return Err(WindowError::Headcount {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    chrono::Duration::try_days(days)
        .and_then(|d| date.checked_add_signed(d))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Half-open interval of minutes since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: u32,
    pub end: u32,
}

impl Window {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Times carrying seconds cannot sit on any slot grid.
    pub fn from_times(start: NaiveTime, end: NaiveTime) -> Result<Self, WindowError> {
        let minutes = |t: NaiveTime| {
            if t.second() != 0 || t.nanosecond() != 0 {
                None
            } else {
                Some(t.hour() * 60 + t.minute())
            }
        };
        match (minutes(start), minutes(end)) {
            (Some(s), Some(e)) => Ok(Self::new(s, e)),
            _ => Err(WindowError::Misaligned { interval: 1 }),
        }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_minute(&self, minute: u32) -> bool {
        self.start <= minute && minute < self.end
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.start / 60, self.start % 60, 0)
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.end / 60, self.end % 60, 0)
    }

    /// First instant of the window on `date`.
    pub fn starts_at(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        self.start_time().map(|t| date.and_time(t))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    Empty,
    Misaligned { interval: u32 },
    OutsideOpeningHours { open: u32, close: u32 },
    SlotCount { min: u32, max: u32, requested: u32 },
    DateOutOfRange { earliest: NaiveDate, latest: NaiveDate },
    StartsInPast,
    Headcount { capacity: i32 },
}

fn hhmm(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::Empty => write!(f, "end time must be after start time"),
            WindowError::Misaligned { interval } => {
                write!(f, "times must align to the {interval}-minute slot grid")
            }
            WindowError::OutsideOpeningHours { open, close } => write!(
                f,
                "booking must fall within opening hours {}-{}",
                hhmm(*open),
                hhmm(*close)
            ),
            WindowError::SlotCount {
                min,
                max,
                requested,
            } => write!(
                f,
                "booking must span between {min} and {max} slots, got {requested}"
            ),
            WindowError::DateOutOfRange { earliest, latest } => {
                write!(f, "date must be between {earliest} and {latest}")
            }
            WindowError::StartsInPast => write!(f, "booking must start in the future"),
            WindowError::Headcount { capacity } => {
                write!(f, "headcount must be between 1 and {capacity}")
            }
        }
    }
}

/// A booking's footprint on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    pub window: Window,
    pub headcount: i32,
}

impl Occupant {
    /// Rows with sub-minute times are widened to whole minutes.
    pub fn from_row(row: &OccupancyRow) -> Self {
        let start = row.start_time.hour() * 60 + row.start_time.minute();
        let end_exact = row.end_time.hour() * 60 + row.end_time.minute();
        let end = if row.end_time.second() != 0 || row.end_time.nanosecond() != 0 {
            end_exact + 1
        } else {
            end_exact
        };
        Self {
            window: Window::new(start, end),
            headcount: row.headcount,
        }
    }
}

/// Largest simultaneous headcount at any instant of `query`.
///
/// Occupancy only rises at an occupant's start, so the peak inside
/// `[query.start, query.end)` is reached at `query.start` or at some
/// occupant start within the window.
pub fn peak_occupancy(occupants: &[Occupant], query: Window) -> i32 {
    let mut points = vec![query.start];
    points.extend(
        occupants
            .iter()
            .map(|o| o.window.start)
            .filter(|&s| s > query.start && s < query.end),
    );

    points
        .into_iter()
        .map(|p| {
            occupants
                .iter()
                .filter(|o| o.window.contains_minute(p))
                .map(|o| o.headcount)
                .sum::<i32>()
        })
        .max()
        .unwrap_or(0)
}

pub fn remaining_capacity(capacity: i32, occupants: &[Occupant], query: Window) -> i32 {
    (capacity - peak_occupancy(occupants, query)).max(0)
}

/// Outcome of checking an exact window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub slot_count: u32,
    pub remaining_capacity: i32,
    pub admissible: bool,
}

/// Shape-check a request and measure capacity for it.
///
/// Shape problems come back as errors; a well-formed request that does not
/// fit is an `Assessment` with `admissible == false`.
pub fn assess(
    params: &SchedulingParams,
    date: NaiveDate,
    window: Window,
    headcount: i32,
    local_now: NaiveDateTime,
    occupants: &[Occupant],
) -> Result<Assessment, Vec<WindowError>> {
    let mut errors = Vec::new();

    let slot_count = params
        .validate_window(window)
        .map_err(|e| errors.push(e))
        .ok();
    if let Err(e) = params.validate_date(date, local_now.date()) {
        errors.push(e);
    }
    if let Err(e) = params.validate_headcount(headcount) {
        errors.push(e);
    }
    if slot_count.is_some() && !starts_after(date, window, local_now) {
        errors.push(WindowError::StartsInPast);
    }

    match slot_count {
        Some(slot_count) if errors.is_empty() => {
            let remaining = remaining_capacity(params.capacity, occupants, window);
            Ok(Assessment {
                slot_count,
                remaining_capacity: remaining,
                admissible: remaining >= headcount,
            })
        }
        _ => Err(errors),
    }
}

fn starts_after(date: NaiveDate, window: Window, local_now: NaiveDateTime) -> bool {
    window
        .starts_at(date)
        .map(|start| start > local_now)
        .unwrap_or(false)
}

/// Remaining capacity per single slot of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCapacity {
    pub window: Window,
    pub remaining_capacity: i32,
}

pub fn slot_capacities(params: &SchedulingParams, occupants: &[Occupant]) -> Vec<WindowCapacity> {
    params
        .windows_of(1)
        .into_iter()
        .map(|window| WindowCapacity {
            window,
            remaining_capacity: remaining_capacity(params.capacity, occupants, window),
        })
        .collect()
}

/// Windows of `slot_count` slots on `date` that still fit `headcount`
/// and have not started yet.
pub fn open_windows(
    params: &SchedulingParams,
    date: NaiveDate,
    occupants: &[Occupant],
    headcount: i32,
    slot_count: u32,
    local_now: NaiveDateTime,
) -> Vec<WindowCapacity> {
    if slot_count < params.min_slot_count || slot_count > params.max_slot_count {
        return Vec::new();
    }
    params
        .windows_of(slot_count)
        .into_iter()
        .filter(|w| starts_after(date, *w, local_now))
        .map(|window| WindowCapacity {
            window,
            remaining_capacity: remaining_capacity(params.capacity, occupants, window),
        })
        .filter(|wc| wc.remaining_capacity >= headcount)
        .collect()
}
