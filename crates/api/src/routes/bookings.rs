use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use infra::models::{BookingRow, ReviewRow};
use serde::Deserialize;
use uuid::Uuid;

use super::paged;
use crate::auth::{permissions::as_customer, CurrentUser};
use crate::domains::booking::service::{self as booking, BookingDetail};
use crate::domains::lifecycle::service::{self as lifecycle, ReviewParams};
use crate::error::AppError;
use crate::response::{created, ok, ApiResponse, PageQuery, Paged};
use crate::state::AppState;

pub async fn get_booking(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    booking_id: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<BookingDetail>, AppError> {
    let Path(booking_id) = booking_id?;
    let detail = booking::get_booking_detail(&state.db, &user, booking_id).await?;
    Ok(ok("Booking retrieved", detail))
}

pub async fn list_ongoing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<Vec<BookingRow>>, AppError> {
    let customer = as_customer(&user)?;
    let rows = booking::list_ongoing(&state.db, &state.clock(), customer.id).await?;
    Ok(ok("Ongoing bookings retrieved", rows))
}

pub async fn list_previous(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<ApiResponse<Paged<BookingRow>>, AppError> {
    let customer = as_customer(&user)?;
    let Query(query) = query?;
    let page = query.resolve()?;
    let (rows, total) =
        booking::list_previous(&state.db, &state.clock(), customer.id, page).await?;
    paged(&state, "Previous bookings retrieved", "/booking/previous", page, rows, total)
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    booking_id: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<BookingRow>, AppError> {
    let customer = as_customer(&user)?;
    let Path(booking_id) = booking_id?;
    let booking =
        lifecycle::cancel_by_customer(&state.db, state.payments(), customer.id, booking_id).await?;
    Ok(ok("Booking cancelled", booking))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub rating: i16,
    #[serde(default)]
    pub content: String,
}

pub async fn post_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    booking_id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ReviewBody>, JsonRejection>,
) -> Result<ApiResponse<ReviewRow>, AppError> {
    let customer = as_customer(&user)?;
    let Path(booking_id) = booking_id?;
    let Json(body) = body?;

    let review = lifecycle::post_review(
        &state.db,
        ReviewParams {
            customer_id: customer.id,
            booking_id,
            rating: body.rating,
            content: body.content,
        },
    )
    .await?;
    Ok(created("Review posted", review))
}
