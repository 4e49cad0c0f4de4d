use infra::{
    db::Db,
    models::{BookingRow, ReviewRow},
    repos::{booking_events, bookings, business_owners, places, reviews, BookingStatus, CreateReview},
};
use serde_json::json;
use sqlx::PgExecutor;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::state::{next_status, BookingEvent};
use crate::constants::{FULFILMENT_BATCH_SIZE, MAX_RATING, MAX_REVIEW_LENGTH, MIN_RATING};
use crate::domains::availability::grid::{remaining_capacity, Occupant, Window};
use crate::domains::clock::VenueClock;
use crate::domains::payout::fees;
use crate::error::{conflict_on_unique, AppError};
use crate::gateways::PaymentGateway;

/// Apply `event` to a booking currently in `from`, compare-and-set.
/// `None` when the event does not apply or another writer got there first.
async fn apply<'e>(
    executor: impl PgExecutor<'e>,
    booking_id: Uuid,
    from: BookingStatus,
    event: BookingEvent,
) -> Result<Option<BookingRow>, AppError> {
    let Some(to) = next_status(from, event) else {
        return Ok(None);
    };
    Ok(bookings::update_status(executor, booking_id, from, to).await?)
}

async fn record<'e>(
    executor: impl PgExecutor<'e>,
    booking_id: Option<Uuid>,
    category: &str,
    action: &str,
    actor_id: Option<Uuid>,
    metadata: serde_json::Value,
) -> Result<(), AppError> {
    booking_events::log_event(executor, booking_id, category, action, actor_id, metadata).await?;
    Ok(())
}

// ── Payment callbacks ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceStatus {
    Paid,
    Expired,
    Other(String),
}

impl InvoiceStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "PAID" | "SETTLED" => InvoiceStatus::Paid,
            "EXPIRED" => InvoiceStatus::Expired,
            other => InvoiceStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvoiceCallback {
    pub invoice_id: String,
    pub external_id: String,
    pub status: InvoiceStatus,
    /// `None` when the provider sent something that is not a whole rupiah amount.
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Confirmed,
    Expired,
    /// Already processed, or superseded by another transition.
    Duplicate,
    /// Unknown booking or irrelevant status.
    Ignored,
    AmountMismatch,
    /// Paid after the hold was released, or its window no longer fits.
    LateRejected,
}

async fn find_callback_booking(
    db: &Db,
    callback: &InvoiceCallback,
) -> Result<Option<BookingRow>, AppError> {
    if let Some(booking) = bookings::find_by_payment_reference(db, &callback.invoice_id).await? {
        return Ok(Some(booking));
    }
    // The callback can beat the reference being stored.
    let Ok(booking_id) = Uuid::parse_str(&callback.external_id) else {
        return Ok(None);
    };
    Ok(bookings::get_by_id(db, booking_id)
        .await?
        .filter(|b| b.payment_reference.is_none()))
}

/// Advance a booking from an invoice callback. Never fails for unknown or
/// inconsistent callbacks; those are recorded as alerts and acknowledged.
pub async fn handle_invoice_callback(
    db: &Db,
    clock: &VenueClock,
    callback: InvoiceCallback,
) -> Result<CallbackOutcome, AppError> {
    let Some(booking) = find_callback_booking(db, &callback).await? else {
        warn!(
            invoice_id = %callback.invoice_id,
            external_id = %callback.external_id,
            "Invoice callback does not match any booking"
        );
        record(
            db,
            None,
            "alert",
            "unmatched_callback",
            None,
            json!({ "invoice_id": callback.invoice_id, "external_id": callback.external_id }),
        )
        .await?;
        return Ok(CallbackOutcome::Ignored);
    };

    match &callback.status {
        InvoiceStatus::Paid => handle_paid(db, clock, &booking, &callback).await,
        InvoiceStatus::Expired => {
            let mut tx = db.begin().await?;
            let Some(expired) = apply(
                &mut *tx,
                booking.id,
                BookingStatus::AwaitingPayment,
                BookingEvent::PaymentExpired,
            )
            .await?
            else {
                return Ok(CallbackOutcome::Duplicate);
            };
            record(
                &mut *tx,
                Some(expired.id),
                "booking",
                BookingEvent::PaymentExpired.as_str(),
                None,
                json!({ "invoice_id": callback.invoice_id }),
            )
            .await?;
            tx.commit().await?;
            info!(booking_id = %expired.id, "Booking expired by provider");
            Ok(CallbackOutcome::Expired)
        }
        InvoiceStatus::Other(status) => {
            info!(booking_id = %booking.id, %status, "Ignoring invoice callback status");
            Ok(CallbackOutcome::Ignored)
        }
    }
}

async fn handle_paid(
    db: &Db,
    clock: &VenueClock,
    booking: &BookingRow,
    callback: &InvoiceCallback,
) -> Result<CallbackOutcome, AppError> {
    match booking.status {
        BookingStatus::AwaitingPayment => {}
        BookingStatus::Expired | BookingStatus::Cancelled => {
            error!(booking_id = %booking.id, status = booking.status.as_str(), "Payment received for released booking");
            record(
                db,
                Some(booking.id),
                "alert",
                "paid_after_release",
                None,
                json!({ "invoice_id": callback.invoice_id, "amount": callback.amount }),
            )
            .await?;
            return Ok(CallbackOutcome::LateRejected);
        }
        _ => return Ok(CallbackOutcome::Duplicate),
    }

    if callback.amount != Some(booking.total_price) {
        error!(
            booking_id = %booking.id,
            expected = booking.total_price,
            received = ?callback.amount,
            "Paid amount does not match booking total"
        );
        record(
            db,
            Some(booking.id),
            "alert",
            "amount_mismatch",
            None,
            json!({
                "invoice_id": callback.invoice_id,
                "expected": booking.total_price,
                "received": callback.amount,
            }),
        )
        .await?;
        return Ok(CallbackOutcome::AmountMismatch);
    }

    let mut tx = db.begin().await?;
    let place = places::lock_for_update(&mut *tx, booking.place_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Place not found".into()))?;

    // Re-read under the lock; a sweeper or a twin callback may have moved it.
    let Some(current) = bookings::get_by_id(&mut *tx, booking.id).await? else {
        return Ok(CallbackOutcome::Ignored);
    };
    if current.status != BookingStatus::AwaitingPayment {
        return Ok(CallbackOutcome::Duplicate);
    }

    // Admissions on a later clock may already have given this hold's
    // capacity away. Recheck against every other occupant.
    let stale = current.created_at <= clock.hold_cutoff();
    let occupants: Vec<Occupant> = bookings::list_occupying(
        &mut *tx,
        current.place_id,
        current.date,
        current.date,
        clock.hold_cutoff(),
    )
    .await?
    .iter()
    .filter(|row| row.id != current.id)
    .map(Occupant::from_row)
    .collect();
    let window = Window::from_times(current.start_time, current.end_time)
        .map_err(|e| AppError::Internal(format!("stored booking window: {e}")))?;
    let remaining = remaining_capacity(place.capacity, &occupants, window);

    if remaining < current.headcount {
        apply(
            &mut *tx,
            current.id,
            BookingStatus::AwaitingPayment,
            BookingEvent::PaymentExpired,
        )
        .await?;
        record(
            &mut *tx,
            Some(current.id),
            "alert",
            "late_payment_rejected",
            None,
            json!({
                "invoice_id": callback.invoice_id,
                "remaining_capacity": remaining,
                "late": stale,
            }),
        )
        .await?;
        tx.commit().await?;
        error!(booking_id = %current.id, remaining, "Payment could not be honoured, window is full");
        return Ok(CallbackOutcome::LateRejected);
    }
    if stale {
        warn!(booking_id = %current.id, "Confirming payment received after hold lapsed");
    }

    let Some(confirmed) = apply(
        &mut *tx,
        current.id,
        BookingStatus::AwaitingPayment,
        BookingEvent::Paid,
    )
    .await?
    else {
        return Ok(CallbackOutcome::Duplicate);
    };
    record(
        &mut *tx,
        Some(confirmed.id),
        "booking",
        BookingEvent::Paid.as_str(),
        None,
        json!({ "invoice_id": callback.invoice_id, "amount": callback.amount, "late": stale }),
    )
    .await?;
    tx.commit().await?;

    info!(booking_id = %confirmed.id, "Booking confirmed");
    Ok(CallbackOutcome::Confirmed)
}

// ── Time-driven transitions ─────────────────────────────────────────

/// Expire every hold that outlived the booking hold. Returns the expired ids.
pub async fn expire_stale_bookings(db: &Db, clock: &VenueClock) -> Result<Vec<Uuid>, AppError> {
    let mut tx = db.begin().await?;
    let expired = bookings::expire_stale(&mut *tx, clock.hold_cutoff()).await?;
    for booking_id in &expired {
        record(
            &mut *tx,
            Some(*booking_id),
            "booking",
            BookingEvent::PaymentExpired.as_str(),
            None,
            json!({ "reason": "hold_lapsed" }),
        )
        .await?;
    }
    tx.commit().await?;

    if !expired.is_empty() {
        info!(count = expired.len(), "Expired unpaid bookings");
    }
    Ok(expired)
}

/// Fulfil confirmed bookings whose end has passed and credit their owners.
/// Each booking commits on its own; a failure is logged and skipped.
pub async fn fulfil_ended_bookings(db: &Db, clock: &VenueClock) -> Result<Vec<Uuid>, AppError> {
    let candidates =
        bookings::list_ended_confirmed(db, clock.local_now(), FULFILMENT_BATCH_SIZE).await?;

    let mut fulfilled = Vec::new();
    for booking in candidates {
        match fulfil_one(db, &booking).await {
            Ok(true) => fulfilled.push(booking.id),
            Ok(false) => {}
            Err(e) => warn!(booking_id = %booking.id, error = %e, "Failed to fulfil booking"),
        }
    }
    Ok(fulfilled)
}

async fn fulfil_one(db: &Db, booking: &BookingRow) -> Result<bool, AppError> {
    let mut tx = db.begin().await?;

    if apply(
        &mut *tx,
        booking.id,
        BookingStatus::Confirmed,
        BookingEvent::ScheduledEndReached,
    )
    .await?
    .is_none()
    {
        return Ok(false);
    }

    let owner_id = places::get_owner_id(&mut *tx, booking.place_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Place not found".into()))?;
    let credit = fees::owner_credit(booking.total_price);
    business_owners::credit(&mut *tx, owner_id, credit).await?;

    record(
        &mut *tx,
        Some(booking.id),
        "booking",
        BookingEvent::ScheduledEndReached.as_str(),
        None,
        json!({ "owner_id": owner_id, "owner_credit": credit }),
    )
    .await?;
    tx.commit().await?;

    info!(booking_id = %booking.id, owner_id = %owner_id, credit, "Booking fulfilled");
    Ok(true)
}

// ── User-driven transitions ─────────────────────────────────────────

pub async fn cancel_by_customer(
    db: &Db,
    payments: &dyn PaymentGateway,
    customer_id: Uuid,
    booking_id: Uuid,
) -> Result<BookingRow, AppError> {
    let booking = bookings::get_by_id(db, booking_id)
        .await?
        .filter(|b| b.user_id == customer_id)
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

    let mut tx = db.begin().await?;
    let cancelled = apply(
        &mut *tx,
        booking.id,
        BookingStatus::AwaitingPayment,
        BookingEvent::CustomerCancelled,
    )
    .await?
    .ok_or_else(|| AppError::Conflict("Only bookings awaiting payment can be cancelled".into()))?;
    record(
        &mut *tx,
        Some(cancelled.id),
        "booking",
        BookingEvent::CustomerCancelled.as_str(),
        Some(customer_id),
        json!({}),
    )
    .await?;
    tx.commit().await?;

    if let Some(reference) = &cancelled.payment_reference {
        if let Err(e) = payments.expire_invoice(reference).await {
            warn!(booking_id = %cancelled.id, error = %e, "Could not expire invoice at provider");
        }
    }

    info!(booking_id = %cancelled.id, "Booking cancelled by customer");
    Ok(cancelled)
}

pub async fn cancel_by_owner(
    db: &Db,
    clock: &VenueClock,
    owner_id: Uuid,
    booking_id: Uuid,
) -> Result<BookingRow, AppError> {
    let booking = bookings::get_by_id(db, booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
    crate::auth::permissions::require_place_owner(db, owner_id, booking.place_id).await?;

    if booking.status != BookingStatus::Confirmed {
        return Err(AppError::Conflict(
            "Only confirmed bookings can be cancelled".into(),
        ));
    }
    if booking.date.and_time(booking.start_time) <= clock.local_now() {
        return Err(AppError::Conflict("Booking has already started".into()));
    }

    let mut tx = db.begin().await?;
    let cancelled = apply(
        &mut *tx,
        booking.id,
        BookingStatus::Confirmed,
        BookingEvent::OwnerCancelled,
    )
    .await?
    .ok_or_else(|| AppError::Conflict("Booking changed state, try again".into()))?;
    record(
        &mut *tx,
        Some(cancelled.id),
        "booking",
        BookingEvent::OwnerCancelled.as_str(),
        Some(owner_id),
        json!({}),
    )
    .await?;
    tx.commit().await?;

    info!(booking_id = %cancelled.id, "Booking cancelled by owner");
    Ok(cancelled)
}

#[derive(Debug, Clone)]
pub struct ReviewParams {
    pub customer_id: Uuid,
    pub booking_id: Uuid,
    pub rating: i16,
    pub content: String,
}

fn validate_review(params: &ReviewParams) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if !(MIN_RATING..=MAX_RATING).contains(&params.rating) {
        errors.push(format!("rating must be between {MIN_RATING} and {MAX_RATING}"));
    }
    if params.content.chars().count() > MAX_REVIEW_LENGTH {
        errors.push(format!(
            "content must be at most {MAX_REVIEW_LENGTH} characters"
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(errors))
    }
}

/// Review a fulfilled booking and move it to `Reviewed`, atomically.
pub async fn post_review(db: &Db, params: ReviewParams) -> Result<ReviewRow, AppError> {
    validate_review(&params)?;

    let booking = bookings::get_by_id(db, params.booking_id)
        .await?
        .filter(|b| b.user_id == params.customer_id)
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

    match booking.status {
        BookingStatus::Fulfilled => {}
        BookingStatus::Reviewed => {
            return Err(AppError::Conflict("Booking has already been reviewed".into()))
        }
        _ => {
            return Err(AppError::Conflict(
                "Only fulfilled bookings can be reviewed".into(),
            ))
        }
    }

    let mut tx = db.begin().await?;
    let review = reviews::create(
        &mut *tx,
        CreateReview {
            user_id: params.customer_id,
            place_id: booking.place_id,
            booking_id: booking.id,
            rating: params.rating,
            content: params.content,
        },
    )
    .await
    .map_err(|e| conflict_on_unique(e, "Booking has already been reviewed"))?;

    apply(
        &mut *tx,
        booking.id,
        BookingStatus::Fulfilled,
        BookingEvent::ReviewPosted,
    )
    .await?
    .ok_or_else(|| AppError::Conflict("Booking has already been reviewed".into()))?;
    record(
        &mut *tx,
        Some(booking.id),
        "booking",
        BookingEvent::ReviewPosted.as_str(),
        Some(params.customer_id),
        json!({ "review_id": review.id, "rating": review.rating }),
    )
    .await?;
    tx.commit().await?;

    info!(booking_id = %booking.id, review_id = %review.id, "Review posted");
    Ok(review)
}
