use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use infra::models::{ItemRow, PlaceSummaryRow, ReviewRow};
use serde::Deserialize;
use uuid::Uuid;

use super::paged;
use crate::auth::{permissions::as_customer, CurrentUser};
use crate::domains::availability::service::{
    self as availability, DateRangeQuery, DayAvailability, DayQuery, WindowAvailability,
    WindowQuery,
};
use crate::domains::booking::service::{self as booking, CreateBookingParams, PlacedBooking, RequestedItem};
use crate::domains::catalogue::service::{self as catalogue, PlaceDetail};
use crate::error::AppError;
use crate::response::{created, ok, ApiResponse, PageQuery, Paged};
use crate::state::AppState;

pub async fn list_places(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<ApiResponse<Paged<PlaceSummaryRow>>, AppError> {
    let Query(query) = query?;
    let page = query.resolve()?;
    let (rows, total) = catalogue::list_places_paged(&state.db, page).await?;
    paged(&state, "Places retrieved", "/place", page, rows, total)
}

pub async fn get_place(
    State(state): State<AppState>,
    place_id: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<PlaceDetail>, AppError> {
    let Path(place_id) = place_id?;
    let detail = catalogue::get_place_detail(&state.db, place_id).await?;
    Ok(ok("Place retrieved", detail))
}

pub async fn list_items(
    State(state): State<AppState>,
    place_id: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Vec<ItemRow>>, AppError> {
    let Path(place_id) = place_id?;
    let items = catalogue::list_items(&state.db, place_id).await?;
    Ok(ok("Items retrieved", items))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    place_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<ApiResponse<Paged<ReviewRow>>, AppError> {
    let Path(place_id) = place_id?;
    let Query(query) = query?;
    let page = query.resolve()?;
    let (rows, total) = catalogue::list_reviews_paged(&state.db, place_id, page).await?;
    paged(
        &state,
        "Reviews retrieved",
        &format!("/place/{place_id}/review"),
        page,
        rows,
        total,
    )
}

#[derive(Debug, Deserialize)]
pub struct AvailableDateQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub headcount: i32,
    pub slot_count: u32,
}

pub async fn available_dates(
    State(state): State<AppState>,
    place_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<AvailableDateQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<NaiveDate>>, AppError> {
    let Path(place_id) = place_id?;
    let Query(query) = query?;
    let dates = availability::available_dates(
        &state.db,
        &state.clock(),
        DateRangeQuery {
            place_id,
            start_date: query.start_date,
            end_date: query.end_date,
            headcount: query.headcount,
            slot_count: query.slot_count,
        },
    )
    .await?;
    Ok(ok("Available dates retrieved", dates))
}

#[derive(Debug, Deserialize)]
pub struct AvailableTimeQuery {
    pub date: NaiveDate,
    pub headcount: i32,
    pub slot_count: Option<u32>,
}

pub async fn available_times(
    State(state): State<AppState>,
    place_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<AvailableTimeQuery>, QueryRejection>,
) -> Result<ApiResponse<DayAvailability>, AppError> {
    let Path(place_id) = place_id?;
    let Query(query) = query?;
    let day = availability::available_times(
        &state.db,
        &state.clock(),
        DayQuery {
            place_id,
            date: query.date,
            headcount: query.headcount,
            slot_count: query.slot_count,
        },
    )
    .await?;
    Ok(ok("Available times retrieved", day))
}

#[derive(Debug, Deserialize)]
pub struct CheckWindowQuery {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub headcount: i32,
}

pub async fn check_window(
    State(state): State<AppState>,
    place_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<CheckWindowQuery>, QueryRejection>,
) -> Result<ApiResponse<WindowAvailability>, AppError> {
    let Path(place_id) = place_id?;
    let Query(query) = query?;
    let result = availability::check_window(
        &state.db,
        &state.clock(),
        WindowQuery {
            place_id,
            date: query.date,
            start_time: query.start_time,
            end_time: query.end_time,
            headcount: query.headcount,
        },
    )
    .await?;
    Ok(ok("Availability checked", result))
}

#[derive(Debug, Deserialize)]
pub struct BookingItemBody {
    pub id: Uuid,
    pub quantity: i32,
    pub price: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingBody {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub headcount: i32,
    #[serde(default)]
    pub items: Vec<BookingItemBody>,
}

pub async fn create_booking(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    place_id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CreateBookingBody>, JsonRejection>,
) -> Result<ApiResponse<PlacedBooking>, AppError> {
    let customer = as_customer(&user)?;
    let Path(place_id) = place_id?;
    let Json(body) = body?;

    let params = CreateBookingParams {
        place_id,
        user_id: customer.id,
        date: body.date,
        start_time: body.start_time,
        end_time: body.end_time,
        headcount: body.headcount,
        items: body
            .items
            .into_iter()
            .map(|i| RequestedItem {
                item_id: i.id,
                quantity: i.quantity,
                unit_price: i.price,
            })
            .collect(),
    };

    let placed = booking::place_booking(
        &state.db,
        state.payments(),
        &state.clock(),
        params,
        &customer.email,
    )
    .await?;
    Ok(created("Booking created", placed))
}
