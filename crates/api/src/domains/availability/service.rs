use chrono::{Days, NaiveDate, NaiveTime};
use infra::{db::Db, models::PlaceRow, repos::bookings};
use serde::Serialize;
use sqlx::PgExecutor;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::grid::{self, Occupant, SchedulingParams, Window, WindowCapacity, WindowError};
use crate::constants::MAX_AVAILABLE_DATE_SPAN_DAYS;
use crate::domains::{catalogue::service as catalogue, clock::VenueClock};
use crate::error::AppError;

/// Exact window to check.
#[derive(Debug, Clone, Copy)]
pub struct WindowQuery {
    pub place_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub headcount: i32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct WindowAvailability {
    pub admissible: bool,
    pub remaining_capacity: i32,
    pub slot_count: u32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub remaining_capacity: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
    /// Bookable windows for the requested headcount, grouped by slot count.
    pub windows: BTreeMap<u32, Vec<TimeSlot>>,
}

/// Occupants of one day, taking the hold freshness from `clock`.
pub async fn load_occupants<'e>(
    executor: impl PgExecutor<'e>,
    place_id: Uuid,
    date: NaiveDate,
    clock: &VenueClock,
) -> sqlx::Result<Vec<Occupant>> {
    let rows = bookings::list_occupying(executor, place_id, date, date, clock.hold_cutoff()).await?;
    Ok(rows.iter().map(Occupant::from_row).collect())
}

pub(crate) fn window_errors(errors: Vec<WindowError>) -> AppError {
    AppError::InvalidRequest(errors.into_iter().map(|e| e.to_string()).collect())
}

/// Shape-check and measure `query` against `place` using `occupants`.
pub fn assess_window(
    place: &PlaceRow,
    query: &WindowQuery,
    clock: &VenueClock,
    occupants: &[Occupant],
) -> Result<WindowAvailability, AppError> {
    let params = SchedulingParams::from_place(place);
    let window =
        Window::from_times(query.start_time, query.end_time).map_err(|e| window_errors(vec![e]))?;

    let assessment = grid::assess(
        &params,
        query.date,
        window,
        query.headcount,
        clock.local_now(),
        occupants,
    )
    .map_err(window_errors)?;

    Ok(WindowAvailability {
        admissible: assessment.admissible,
        remaining_capacity: assessment.remaining_capacity,
        slot_count: assessment.slot_count,
    })
}

pub async fn check_window(
    db: &Db,
    clock: &VenueClock,
    query: WindowQuery,
) -> Result<WindowAvailability, AppError> {
    let place = catalogue::get_place(db, query.place_id).await?;
    let occupants = load_occupants(db, place.id, query.date, clock).await?;
    assess_window(&place, &query, clock, &occupants)
}

#[derive(Debug, Clone, Copy)]
pub struct DateRangeQuery {
    pub place_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub headcount: i32,
    pub slot_count: u32,
}

/// Dates in the requested range that still have at least one bookable
/// window of `slot_count` slots for `headcount` people.
///
/// The range is clipped to the place's booking horizon.
pub async fn available_dates(
    db: &Db,
    clock: &VenueClock,
    query: DateRangeQuery,
) -> Result<Vec<NaiveDate>, AppError> {
    let place = catalogue::get_place(db, query.place_id).await?;
    let params = SchedulingParams::from_place(&place);

    let mut errors = Vec::new();
    if let Err(e) = params.validate_headcount(query.headcount) {
        errors.push(e.to_string());
    }
    if query.slot_count < params.min_slot_count || query.slot_count > params.max_slot_count {
        errors.push(format!(
            "slot_count must be between {} and {}",
            params.min_slot_count, params.max_slot_count
        ));
    }
    let (earliest, latest) = params.booking_range(clock.today());
    let from = query.start_date.unwrap_or(earliest).max(earliest);
    let to = query
        .end_date
        .unwrap_or(latest)
        .min(latest)
        .min(
            from.checked_add_days(Days::new(MAX_AVAILABLE_DATE_SPAN_DAYS - 1))
                .unwrap_or(NaiveDate::MAX),
        );
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if end < start {
            errors.push("end_date must not be before start_date".to_string());
        }
    }
    if !errors.is_empty() {
        return Err(AppError::InvalidRequest(errors));
    }
    if to < from {
        return Ok(Vec::new());
    }

    let rows = bookings::list_occupying(db, place.id, from, to, clock.hold_cutoff()).await?;
    let mut by_date: BTreeMap<NaiveDate, Vec<Occupant>> = BTreeMap::new();
    for row in &rows {
        by_date.entry(row.date).or_default().push(Occupant::from_row(row));
    }

    let local_now = clock.local_now();
    let dates = from
        .iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| {
            let occupants = by_date.get(d).map(Vec::as_slice).unwrap_or(&[]);
            !grid::open_windows(
                &params,
                *d,
                occupants,
                query.headcount,
                query.slot_count,
                local_now,
            )
            .is_empty()
        })
        .collect();

    Ok(dates)
}

#[derive(Debug, Clone, Copy)]
pub struct DayQuery {
    pub place_id: Uuid,
    pub date: NaiveDate,
    pub headcount: i32,
    pub slot_count: Option<u32>,
}

/// Per-slot remaining capacity for a day plus the windows still bookable
/// for `headcount`.
pub async fn available_times(
    db: &Db,
    clock: &VenueClock,
    query: DayQuery,
) -> Result<DayAvailability, AppError> {
    let place = catalogue::get_place(db, query.place_id).await?;
    let params = SchedulingParams::from_place(&place);

    let mut errors = Vec::new();
    if let Err(e) = params.validate_date(query.date, clock.today()) {
        errors.push(e);
    }
    if let Err(e) = params.validate_headcount(query.headcount) {
        errors.push(e);
    }
    if !errors.is_empty() {
        return Err(window_errors(errors));
    }

    let occupants = load_occupants(db, place.id, query.date, clock).await?;
    let local_now = clock.local_now();

    let slot_counts = match query.slot_count {
        Some(n) => n..=n,
        None => params.min_slot_count..=params.max_slot_count,
    };
    let windows = slot_counts
        .map(|n| {
            let open =
                grid::open_windows(&params, query.date, &occupants, query.headcount, n, local_now);
            (n, to_time_slots(&open))
        })
        .filter(|(_, slots)| !slots.is_empty())
        .collect();

    Ok(DayAvailability {
        date: query.date,
        slots: to_time_slots(&grid::slot_capacities(&params, &occupants)),
        windows,
    })
}

fn to_time_slots(capacities: &[WindowCapacity]) -> Vec<TimeSlot> {
    capacities
        .iter()
        .filter_map(|c| {
            Some(TimeSlot {
                start_time: c.window.start_time()?,
                end_time: c.window.end_time()?,
                remaining_capacity: c.remaining_capacity,
            })
        })
        .collect()
}
