use chrono::{NaiveDate, NaiveTime};
use infra::{
    db::Db,
    models::{BookingItemRow, BookingRow},
    repos::{
        booking_events, bookings, items, places, BookingStatus, CreateBooking, CreateBookingItem,
    },
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

use super::pricing::{self, PricedItem, PricingError};
use crate::auth::User;
use crate::constants::{BOOKING_HOLD_SECONDS, DEFAULT_PAYMENT_METHODS};
use crate::domains::availability::{
    grid::Window,
    service::{assess_window, load_occupants, WindowQuery},
};
use crate::domains::{catalogue::service as catalogue, clock::VenueClock};
use crate::error::AppError;
use crate::gateways::{InvoiceLine, InvoiceRequest, PaymentGateway};
use crate::response::PageRequest;

#[derive(Debug, Clone)]
pub struct RequestedItem {
    pub item_id: Uuid,
    pub quantity: i32,
    /// Price the client saw. Must still match the catalogue.
    pub unit_price: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CreateBookingParams {
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub headcount: i32,
    pub items: Vec<RequestedItem>,
}

/// What the customer gets back after admission and invoicing.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedBooking {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub total_price: i64,
    pub payment_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: BookingRow,
    pub items: Vec<BookingItemRow>,
}

fn validate_syntax(params: &CreateBookingParams) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if params.headcount < 1 {
        errors.push("headcount must be at least 1".to_string());
    }
    if let Err(e) = Window::from_times(params.start_time, params.end_time) {
        errors.push(e.to_string());
    }
    if params.end_time <= params.start_time {
        errors.push("end time must be after start time".to_string());
    }

    let mut seen = HashSet::new();
    for item in &params.items {
        if item.quantity < 1 {
            errors.push(format!("quantity for item {} must be positive", item.item_id));
        }
        if item.unit_price.is_some_and(|p| p < 0) {
            errors.push(format!("price for item {} must not be negative", item.item_id));
        }
        if !seen.insert(item.item_id) {
            errors.push(format!("item {} is listed more than once", item.item_id));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(errors))
    }
}

/// Validate, price and record an `AwaitingPayment` booking.
///
/// Capacity check and insert run under the place row lock, so two
/// admissions for the same place never both see the same free capacity.
pub async fn create_booking(
    db: &Db,
    clock: &VenueClock,
    params: CreateBookingParams,
) -> Result<(BookingRow, Vec<BookingItemRow>), AppError> {
    validate_syntax(&params)?;

    let mut tx = db.begin().await?;

    let place = places::lock_for_update(&mut *tx, params.place_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Place not found".into()))?;

    let query = WindowQuery {
        place_id: place.id,
        date: params.date,
        start_time: params.start_time,
        end_time: params.end_time,
        headcount: params.headcount,
    };
    let occupants = load_occupants(&mut *tx, place.id, params.date, clock).await?;
    let availability = assess_window(&place, &query, clock, &occupants)?;
    if !availability.admissible {
        return Err(AppError::Unavailable(format!(
            "Only {} places left for the requested time",
            availability.remaining_capacity
        )));
    }

    let requested_ids: Vec<Uuid> = params.items.iter().map(|i| i.item_id).collect();
    let catalogue_items = if requested_ids.is_empty() {
        Vec::new()
    } else {
        items::get_many(&mut *tx, &requested_ids).await?
    };

    let mut item_errors = Vec::new();
    let mut priced = Vec::with_capacity(params.items.len());
    for requested in &params.items {
        let Some(item) = catalogue_items
            .iter()
            .find(|i| i.id == requested.item_id && i.place_id == place.id)
        else {
            item_errors.push(format!(
                "item {} does not belong to this place",
                requested.item_id
            ));
            continue;
        };
        if requested.unit_price.is_some_and(|p| p != item.price) {
            item_errors.push(format!("price of {} has changed", item.name));
            continue;
        }
        priced.push(PricedItem {
            item_id: item.id,
            quantity: requested.quantity,
            unit_price: item.price,
        });
    }
    if !item_errors.is_empty() {
        return Err(AppError::InvalidRequest(item_errors));
    }

    let quote = pricing::quote(
        place.ticket_price,
        params.headcount,
        availability.slot_count,
        &priced,
    )
    .map_err(|e| match e {
        PricingError::Overflow => AppError::invalid("booking total is too large"),
        other => AppError::invalid(other.to_string()),
    })?;

    let booking = bookings::create(
        &mut *tx,
        CreateBooking {
            place_id: place.id,
            user_id: params.user_id,
            date: params.date,
            start_time: params.start_time,
            end_time: params.end_time,
            headcount: params.headcount,
            total_price_ticket: quote.ticket_total,
            total_price_item: quote.items_total,
            total_fee: quote.fees,
            total_price: quote.total_price,
            created_at: clock.now(),
        },
    )
    .await?;

    let lines: Vec<CreateBookingItem> = quote
        .lines
        .iter()
        .map(|l| CreateBookingItem {
            item_id: l.item_id,
            quantity: l.quantity,
            unit_price: l.unit_price,
            line_total: l.line_total,
        })
        .collect();
    bookings::insert_items(&mut *tx, booking.id, &lines).await?;

    booking_events::log_event(
        &mut *tx,
        Some(booking.id),
        "booking",
        "created",
        Some(params.user_id),
        json!({
            "total_price": booking.total_price,
            "headcount": booking.headcount,
            "slot_count": availability.slot_count,
        }),
    )
    .await?;

    let booking_items = bookings::list_items(&mut *tx, booking.id).await?;
    tx.commit().await?;

    info!(
        booking_id = %booking.id,
        place_id = %place.id,
        total_price = booking.total_price,
        "Booking admitted"
    );

    Ok((booking, booking_items))
}

/// Ask the payment gateway for an invoice and store its reference.
///
/// If the gateway cannot be reached the hold is released straight away
/// rather than left to block capacity until it lapses.
pub async fn request_invoice(
    db: &Db,
    payments: &dyn PaymentGateway,
    booking: &BookingRow,
    booking_items: &[BookingItemRow],
    payer_email: &str,
) -> Result<BookingRow, AppError> {
    let place = catalogue::get_place(db, booking.place_id).await?;

    let mut lines = vec![InvoiceLine {
        name: format!("{} ticket", place.name),
        quantity: 1,
        price: booking.total_price_ticket,
    }];
    lines.extend(booking_items.iter().map(|i| InvoiceLine {
        name: i.item_name.clone(),
        quantity: i.quantity,
        price: i.unit_price,
    }));
    if booking.total_fee > 0 {
        lines.push(InvoiceLine {
            name: "Service fee".to_string(),
            quantity: 1,
            price: booking.total_fee,
        });
    }

    let request = InvoiceRequest {
        external_id: booking.id.to_string(),
        amount: booking.total_price,
        payer_email: payer_email.to_string(),
        description: format!(
            "{} on {} {}-{}",
            place.name,
            booking.date,
            booking.start_time.format("%H:%M"),
            booking.end_time.format("%H:%M")
        ),
        duration_seconds: BOOKING_HOLD_SECONDS,
        payment_methods: DEFAULT_PAYMENT_METHODS.iter().map(|m| m.to_string()).collect(),
        lines,
    };

    let invoice = match payments.create_invoice(request).await {
        Ok(invoice) => invoice,
        Err(err) => {
            warn!(booking_id = %booking.id, error = %err, "Invoice creation failed, releasing hold");
            let mut tx = db.begin().await?;
            if bookings::update_status(
                &mut *tx,
                booking.id,
                BookingStatus::AwaitingPayment,
                BookingStatus::Expired,
            )
            .await?
            .is_some()
            {
                booking_events::log_event(
                    &mut *tx,
                    Some(booking.id),
                    "booking",
                    "invoice_failed",
                    None,
                    json!({ "error": err.to_string() }),
                )
                .await?;
            }
            tx.commit().await?;
            return Err(err.into());
        }
    };

    bookings::attach_payment_reference(db, booking.id, &invoice.id, &invoice.invoice_url)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))
}

/// Admission followed by invoicing: the full `POST /place/{id}/booking` flow.
pub async fn place_booking(
    db: &Db,
    payments: &dyn PaymentGateway,
    clock: &VenueClock,
    params: CreateBookingParams,
    payer_email: &str,
) -> Result<PlacedBooking, AppError> {
    let (booking, booking_items) = create_booking(db, clock, params).await?;
    let booking = request_invoice(db, payments, &booking, &booking_items, payer_email).await?;

    Ok(PlacedBooking {
        booking_id: booking.id,
        status: booking.status,
        total_price: booking.total_price,
        payment_url: booking.payment_url,
    })
}

/// Customers see their own bookings; owners see bookings at their place.
pub async fn get_booking_detail(
    db: &Db,
    viewer: &User,
    booking_id: Uuid,
) -> Result<BookingDetail, AppError> {
    let booking = bookings::get_by_id(db, booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

    let allowed = match viewer {
        User::Customer(c) => booking.user_id == c.id,
        User::BusinessAdmin(b) => catalogue::get_owner_of_place(db, booking.place_id).await? == b.id,
    };
    if !allowed {
        // Do not reveal that someone else's booking exists.
        return Err(AppError::NotFound("Booking not found".into()));
    }

    let items = bookings::list_items(db, booking.id).await?;
    Ok(BookingDetail { booking, items })
}

pub async fn list_for_owner(
    db: &Db,
    owner_id: Uuid,
    place_id: Uuid,
    status: Option<BookingStatus>,
    page: PageRequest,
) -> Result<(Vec<BookingRow>, i64), AppError> {
    crate::auth::permissions::require_place_owner(db, owner_id, place_id).await?;

    let rows = bookings::list_for_place(db, place_id, status, page.limit_offset()).await?;
    let total = bookings::count_for_place(db, place_id, status).await?;
    Ok((rows, total))
}

pub async fn list_ongoing(
    db: &Db,
    clock: &VenueClock,
    user_id: Uuid,
) -> Result<Vec<BookingRow>, AppError> {
    Ok(bookings::list_ongoing_for_customer(db, user_id, clock.hold_cutoff()).await?)
}

pub async fn list_previous(
    db: &Db,
    clock: &VenueClock,
    user_id: Uuid,
    page: PageRequest,
) -> Result<(Vec<BookingRow>, i64), AppError> {
    let cutoff = clock.hold_cutoff();
    let rows =
        bookings::list_previous_for_customer(db, user_id, cutoff, page.limit_offset()).await?;
    let total = bookings::count_previous_for_customer(db, user_id, cutoff).await?;
    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CreateBookingParams {
        CreateBookingParams {
            place_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            headcount: 4,
            items: Vec::new(),
        }
    }

    #[test]
    fn well_formed_request_passes_syntax() {
        assert!(validate_syntax(&params()).is_ok());
    }

    #[test]
    fn syntax_errors_are_collected() {
        let item = Uuid::new_v4();
        let p = CreateBookingParams {
            headcount: 0,
            end_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            items: vec![
                RequestedItem {
                    item_id: item,
                    quantity: 0,
                    unit_price: None,
                },
                RequestedItem {
                    item_id: item,
                    quantity: 1,
                    unit_price: Some(-5),
                },
            ],
            ..params()
        };

        match validate_syntax(&p) {
            Err(AppError::InvalidRequest(errors)) => assert_eq!(errors.len(), 5),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }
}
