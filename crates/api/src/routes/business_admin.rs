use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use infra::{
    models::{BookingRow, DisbursementRow},
    repos::BookingStatus,
};
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

use super::paged;
use crate::auth::{permissions::as_business_admin, CurrentUser};
use crate::domains::booking::service as booking;
use crate::domains::lifecycle::service as lifecycle;
use crate::domains::payout::service::{self as payout, Balance};
use crate::error::AppError;
use crate::response::{created, ok, ApiResponse, PageQuery, Paged};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OwnerBookingQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    place_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<OwnerBookingQuery>, QueryRejection>,
) -> Result<ApiResponse<Paged<BookingRow>>, AppError> {
    let owner = as_business_admin(&user)?;
    let Path(place_id) = place_id?;
    let Query(query) = query?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(BookingStatus::from_str)
        .transpose()
        .map_err(AppError::invalid)?;
    let page = PageQuery {
        limit: query.limit,
        page: query.page,
    }
    .resolve()?;

    let (rows, total) = booking::list_for_owner(&state.db, owner.id, place_id, status, page).await?;
    let path = match status {
        Some(s) => format!("/business-admin/{place_id}/booking?status={}", s.as_str()),
        None => format!("/business-admin/{place_id}/booking"),
    };
    paged(&state, "Bookings retrieved", &path, page, rows, total)
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    booking_id: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<BookingRow>, AppError> {
    let owner = as_business_admin(&user)?;
    let Path(booking_id) = booking_id?;
    let booking = lifecycle::cancel_by_owner(&state.db, &state.clock(), owner.id, booking_id).await?;
    Ok(ok("Booking cancelled", booking))
}

pub async fn get_balance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<Balance>, AppError> {
    let owner = as_business_admin(&user)?;
    let balance = payout::get_balance(&state.db, owner.id).await?;
    Ok(ok("Balance retrieved", balance))
}

pub async fn list_disbursements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<ApiResponse<Paged<DisbursementRow>>, AppError> {
    let owner = as_business_admin(&user)?;
    let Query(query) = query?;
    let page = query.resolve()?;
    let (rows, total) = payout::list_disbursements(&state.db, owner.id, page).await?;
    paged(
        &state,
        "Disbursements retrieved",
        "/business-admin/disbursement",
        page,
        rows,
        total,
    )
}

#[derive(Debug, Deserialize)]
pub struct DisbursementBody {
    pub amount: i64,
}

pub async fn request_disbursement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<DisbursementBody>, JsonRejection>,
) -> Result<ApiResponse<DisbursementRow>, AppError> {
    let owner = as_business_admin(&user)?;
    let Json(body) = body?;
    let row = payout::request_disbursement(&state.db, state.payments(), owner, body.amount).await?;
    Ok(created("Disbursement requested", row))
}
