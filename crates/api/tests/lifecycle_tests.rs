mod common;

use api::domains::availability::service::{check_window, WindowQuery};
use api::domains::booking::service::{
    create_booking, list_for_owner, list_ongoing, list_previous, place_booking,
};
use api::domains::catalogue::service::get_place_detail;
use api::domains::clock::VenueClock;
use api::domains::lifecycle::service::{
    cancel_by_customer, cancel_by_owner, expire_stale_bookings, fulfil_ended_bookings,
    handle_invoice_callback, post_review, CallbackOutcome, InvoiceCallback, InvoiceStatus,
    ReviewParams,
};
use api::error::ErrorKind;
use api::response::PageRequest;
use chrono::{Duration, NaiveDate, Utc};
use common::*;
use infra::models::BookingRow;
use infra::repos::{booking_events, bookings, BookingStatus};
use uuid::Uuid;

fn paid(booking: &BookingRow, amount: i64) -> InvoiceCallback {
    InvoiceCallback {
        invoice_id: booking
            .payment_reference
            .clone()
            .unwrap_or_else(|| format!("inv-{}", Uuid::new_v4())),
        external_id: booking.id.to_string(),
        status: InvoiceStatus::Paid,
        amount: Some(amount),
    }
}

async fn status_of(app: &TestApp, booking_id: Uuid) -> BookingStatus {
    bookings::get_by_id(&app.state.db, booking_id)
        .await
        .unwrap()
        .expect("Booking missing")
        .status
}

async fn event_actions(app: &TestApp, booking_id: Uuid) -> Vec<String> {
    booking_events::list_by_booking(&app.state.db, booking_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_action)
        .collect()
}

async fn remaining(app: &TestApp, clock: &VenueClock, place_id: Uuid, date: NaiveDate) -> i32 {
    check_window(
        &app.state.db,
        clock,
        WindowQuery {
            place_id,
            date,
            start_time: time(10, 0),
            end_time: time(12, 0),
            headcount: 1,
        },
    )
    .await
    .unwrap()
    .remaining_capacity
}

/// Admit a 10:00-12:00 booking for four people and confirm it.
async fn confirmed_booking(
    app: &TestApp,
    clock: &VenueClock,
    place_id: Uuid,
    customer_id: Uuid,
    date: NaiveDate,
) -> BookingRow {
    let (booking, _) = create_booking(
        &app.state.db,
        clock,
        booking_params(place_id, customer_id, date, time(10, 0), time(12, 0), 4),
    )
    .await
    .expect("Booking should be admitted");

    let outcome = handle_invoice_callback(&app.state.db, clock, paid(&booking, booking.total_price))
        .await
        .unwrap();
    assert_eq!(outcome, CallbackOutcome::Confirmed);
    booking
}

#[tokio::test]
async fn test_paid_booking_is_fulfilled_and_owner_credited() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let clock = clock_at(Utc::now());

    let booking =
        confirmed_booking(&app, &clock, place.id, customer.id, day_after(&clock, 1)).await;
    assert_eq!(booking.total_price, 403_000);
    assert_eq!(status_of(&app, booking.id).await, BookingStatus::Confirmed);
    assert_eq!(owner_balance(&app, owner.id).await, 0);

    let later = clock_at(Utc::now() + Duration::days(2));
    fulfil_ended_bookings(&app.state.db, &later).await.unwrap();

    assert_eq!(status_of(&app, booking.id).await, BookingStatus::Fulfilled);
    // 403,000 - 3,000 platform fee - 5,000 payout fee - 44,330 VAT
    assert_eq!(owner_balance(&app, owner.id).await, 350_670);

    // A second sweep must not credit again.
    fulfil_ended_bookings(&app.state.db, &later).await.unwrap();
    assert_eq!(owner_balance(&app, owner.id).await, 350_670);

    let actions = event_actions(&app, booking.id).await;
    assert!(actions.contains(&"created".to_string()));
    assert!(actions.contains(&"paid".to_string()));
    assert!(actions.contains(&"scheduled_end_reached".to_string()));
}

#[tokio::test]
async fn test_booking_not_fulfilled_before_it_ends() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let clock = clock_at(Utc::now());

    let booking =
        confirmed_booking(&app, &clock, place.id, customer.id, day_after(&clock, 12)).await;
    fulfil_ended_bookings(&app.state.db, &clock).await.unwrap();

    assert_eq!(status_of(&app, booking.id).await, BookingStatus::Confirmed);
    assert_eq!(owner_balance(&app, owner.id).await, 0);
}

#[tokio::test]
async fn test_duplicate_paid_callback_is_idempotent() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let clock = clock_at(Utc::now());

    let booking =
        confirmed_booking(&app, &clock, place.id, customer.id, day_after(&clock, 11)).await;

    let again = handle_invoice_callback(&app.state.db, &clock, paid(&booking, booking.total_price))
        .await
        .unwrap();
    assert_eq!(again, CallbackOutcome::Duplicate);
    assert_eq!(status_of(&app, booking.id).await, BookingStatus::Confirmed);

    let paid_events = event_actions(&app, booking.id)
        .await
        .into_iter()
        .filter(|a| a == "paid")
        .count();
    assert_eq!(paid_events, 1);
}

#[tokio::test]
async fn test_unpaid_hold_expires_after_two_hours() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let base = Utc::now() - Duration::hours(3);
    let created_clock = clock_at(base);
    let date = day_after(&created_clock, 2);

    let (booking, _) = create_booking(
        &app.state.db,
        &created_clock,
        booking_params(place.id, customer.id, date, time(10, 0), time(12, 0), 4),
    )
    .await
    .unwrap();

    let just_before = clock_at(base + Duration::hours(2) - Duration::seconds(1));
    expire_stale_bookings(&app.state.db, &just_before).await.unwrap();
    assert_eq!(status_of(&app, booking.id).await, BookingStatus::AwaitingPayment);
    assert_eq!(remaining(&app, &just_before, place.id, date).await, 6);

    let at_lapse = clock_at(base + Duration::hours(2));
    expire_stale_bookings(&app.state.db, &at_lapse).await.unwrap();
    assert_eq!(status_of(&app, booking.id).await, BookingStatus::Expired);
    assert_eq!(remaining(&app, &at_lapse, place.id, date).await, 10);
}

#[tokio::test]
async fn test_stale_hold_stops_counting_before_sweep() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let created_clock = clock_at(Utc::now() - Duration::hours(2) - Duration::minutes(5));
    let date = day_after(&created_clock, 2);

    create_booking(
        &app.state.db,
        &created_clock,
        booking_params(place.id, customer.id, date, time(10, 0), time(12, 0), 4),
    )
    .await
    .unwrap();

    let now = clock_at(Utc::now());
    assert_eq!(remaining(&app, &now, place.id, date).await, 10);
}

#[tokio::test]
async fn test_provider_expiry_callback_releases_hold() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let clock = clock_at(Utc::now());
    let date = day_after(&clock, 13);

    let (booking, _) = create_booking(
        &app.state.db,
        &clock,
        booking_params(place.id, customer.id, date, time(10, 0), time(12, 0), 4),
    )
    .await
    .unwrap();

    let mut callback = paid(&booking, booking.total_price);
    callback.status = InvoiceStatus::Expired;
    let outcome = handle_invoice_callback(&app.state.db, &clock, callback)
        .await
        .unwrap();

    assert_eq!(outcome, CallbackOutcome::Expired);
    assert_eq!(status_of(&app, booking.id).await, BookingStatus::Expired);
    assert_eq!(remaining(&app, &clock, place.id, date).await, 10);
}

#[tokio::test]
async fn test_amount_mismatch_leaves_booking_unpaid() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let clock = clock_at(Utc::now());

    let (booking, _) = create_booking(
        &app.state.db,
        &clock,
        booking_params(
            place.id,
            customer.id,
            day_after(&clock, 14),
            time(10, 0),
            time(12, 0),
            4,
        ),
    )
    .await
    .unwrap();

    let outcome = handle_invoice_callback(
        &app.state.db,
        &clock,
        paid(&booking, booking.total_price - 1_000),
    )
    .await
    .unwrap();

    assert_eq!(outcome, CallbackOutcome::AmountMismatch);
    assert_eq!(status_of(&app, booking.id).await, BookingStatus::AwaitingPayment);
    assert!(event_actions(&app, booking.id)
        .await
        .contains(&"amount_mismatch".to_string()));
}

#[tokio::test]
async fn test_unmatched_callback_is_acknowledged() {
    let app = setup_test_db().await;
    let clock = clock_at(Utc::now());

    let outcome = handle_invoice_callback(
        &app.state.db,
        &clock,
        InvoiceCallback {
            invoice_id: format!("inv-{}", Uuid::new_v4()),
            external_id: "not-a-booking".to_string(),
            status: InvoiceStatus::Paid,
            amount: Some(1_000),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, CallbackOutcome::Ignored);
}

#[tokio::test]
async fn test_late_payment_confirmed_when_capacity_remains() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let created_clock = clock_at(Utc::now() - Duration::hours(2) - Duration::minutes(5));

    let (booking, _) = create_booking(
        &app.state.db,
        &created_clock,
        booking_params(
            place.id,
            customer.id,
            day_after(&created_clock, 2),
            time(10, 0),
            time(12, 0),
            4,
        ),
    )
    .await
    .unwrap();

    let now = clock_at(Utc::now());
    let outcome = handle_invoice_callback(&app.state.db, &now, paid(&booking, booking.total_price))
        .await
        .unwrap();

    assert_eq!(outcome, CallbackOutcome::Confirmed);
    assert_eq!(status_of(&app, booking.id).await, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_late_payment_rejected_when_window_refilled() {
    let app = setup_test_db().await;
    let late_customer = create_customer(&app).await;
    let other_customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let created_clock = clock_at(Utc::now() - Duration::hours(2) - Duration::minutes(5));
    let date = day_after(&created_clock, 2);

    let (late, _) = create_booking(
        &app.state.db,
        &created_clock,
        booking_params(place.id, late_customer.id, date, time(10, 0), time(12, 0), 4),
    )
    .await
    .unwrap();

    let now = clock_at(Utc::now());
    create_booking(
        &app.state.db,
        &now,
        booking_params(place.id, other_customer.id, date, time(10, 0), time(12, 0), 8),
    )
    .await
    .expect("Lapsed hold should not block the new booking");

    let outcome = handle_invoice_callback(&app.state.db, &now, paid(&late, late.total_price))
        .await
        .unwrap();

    assert_eq!(outcome, CallbackOutcome::LateRejected);
    assert_eq!(status_of(&app, late.id).await, BookingStatus::Expired);
    assert!(event_actions(&app, late.id)
        .await
        .contains(&"late_payment_rejected".to_string()));
}

#[tokio::test]
async fn test_payment_racing_a_later_admission_never_overbooks() {
    let app = setup_test_db().await;
    let first = create_customer(&app).await;
    let second = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let base = Utc::now() - Duration::hours(4);
    let date = day_after(&clock_at(base), 2);

    let (held, _) = create_booking(
        &app.state.db,
        &clock_at(base),
        booking_params(place.id, first.id, date, time(10, 0), time(12, 0), 6),
    )
    .await
    .unwrap();

    // This admission sees the hold as lapsed and takes the whole window.
    let admission_clock = clock_at(base + Duration::hours(2) + Duration::seconds(1));
    create_booking(
        &app.state.db,
        &admission_clock,
        booking_params(place.id, second.id, date, time(10, 0), time(12, 0), 10),
    )
    .await
    .expect("Lapsed hold should not block the full booking");

    // The callback was stamped just before the hold lapsed.
    let callback_clock = clock_at(base + Duration::hours(2) - Duration::seconds(1));
    let outcome =
        handle_invoice_callback(&app.state.db, &callback_clock, paid(&held, held.total_price))
            .await
            .unwrap();

    assert_eq!(outcome, CallbackOutcome::LateRejected);
    assert_eq!(status_of(&app, held.id).await, BookingStatus::Expired);

    let booked: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(headcount), 0)::int8 FROM bookings
         WHERE place_id = $1 AND status IN ('confirmed', 'awaiting_payment')",
    )
    .bind(place.id)
    .fetch_one(&app.state.db)
    .await
    .unwrap();
    assert!(booked <= 10, "window overbooked: {booked}");
}

#[tokio::test]
async fn test_customer_cancels_unpaid_booking() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let stranger = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let clock = clock_at(Utc::now());

    let placed = place_booking(
        &app.state.db,
        app.payments.as_ref(),
        &clock,
        booking_params(
            place.id,
            customer.id,
            day_after(&clock, 15),
            time(10, 0),
            time(12, 0),
            4,
        ),
        &customer.email,
    )
    .await
    .unwrap();

    let err = cancel_by_customer(
        &app.state.db,
        app.payments.as_ref(),
        stranger.id,
        placed.booking_id,
    )
    .await
    .expect_err("Strangers cannot cancel");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let cancelled = cancel_by_customer(
        &app.state.db,
        app.payments.as_ref(),
        customer.id,
        placed.booking_id,
    )
    .await
    .unwrap();
    // Customer cancellation releases the hold the same way a lapse does.
    assert_eq!(cancelled.status, BookingStatus::Expired);
    let reference = cancelled.payment_reference.clone().unwrap();
    assert!(app.payments.expired.lock().unwrap().contains(&reference));

    let err = cancel_by_customer(
        &app.state.db,
        app.payments.as_ref(),
        customer.id,
        placed.booking_id,
    )
    .await
    .expect_err("Cancelled bookings cannot be cancelled again");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // The provider may still report the payment; it must not resurrect the booking.
    let outcome =
        handle_invoice_callback(&app.state.db, &clock, paid(&cancelled, cancelled.total_price))
            .await
            .unwrap();
    assert_eq!(outcome, CallbackOutcome::LateRejected);
    assert_eq!(status_of(&app, cancelled.id).await, BookingStatus::Expired);
}

#[tokio::test]
async fn test_owner_cancels_confirmed_booking() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let other_owner = create_owner(&app).await;
    let clock = clock_at(Utc::now());
    let date = day_after(&clock, 16);

    let booking = confirmed_booking(&app, &clock, place.id, customer.id, date).await;
    assert_eq!(remaining(&app, &clock, place.id, date).await, 6);

    let err = cancel_by_owner(&app.state.db, &clock, other_owner.id, booking.id)
        .await
        .expect_err("Only the place owner can cancel");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let cancelled = cancel_by_owner(&app.state.db, &clock, owner.id, booking.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(remaining(&app, &clock, place.id, date).await, 10);

    let err = cancel_by_owner(&app.state.db, &clock, owner.id, booking.id)
        .await
        .expect_err("Already cancelled");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_owner_cannot_cancel_unpaid_booking() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let clock = clock_at(Utc::now());

    let (booking, _) = create_booking(
        &app.state.db,
        &clock,
        booking_params(
            place.id,
            customer.id,
            day_after(&clock, 17),
            time(10, 0),
            time(12, 0),
            2,
        ),
    )
    .await
    .unwrap();

    let err = cancel_by_owner(&app.state.db, &clock, owner.id, booking.id)
        .await
        .expect_err("Unpaid bookings are not owner-cancellable");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_review_requires_fulfilled_booking() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let clock = clock_at(Utc::now());

    let booking =
        confirmed_booking(&app, &clock, place.id, customer.id, day_after(&clock, 5)).await;
    let review = |rating: i16| ReviewParams {
        customer_id: customer.id,
        booking_id: booking.id,
        rating,
        content: "Tempatnya sejuk".to_string(),
    };

    let err = post_review(&app.state.db, review(5))
        .await
        .expect_err("Confirmed bookings cannot be reviewed yet");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    fulfil_ended_bookings(&app.state.db, &clock_at(Utc::now() + Duration::days(6)))
        .await
        .unwrap();
    assert_eq!(status_of(&app, booking.id).await, BookingStatus::Fulfilled);

    let err = post_review(&app.state.db, review(6))
        .await
        .expect_err("Rating out of range");
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let posted = post_review(&app.state.db, review(5)).await.unwrap();
    assert_eq!(posted.place_id, place.id);
    assert_eq!(status_of(&app, booking.id).await, BookingStatus::Reviewed);

    let err = post_review(&app.state.db, review(4))
        .await
        .expect_err("Only one review per booking");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let detail = get_place_detail(&app.state.db, place.id).await.unwrap();
    assert_eq!(detail.rating_count, 1);
    assert_eq!(detail.rating_average, Some(5.0));
}

#[tokio::test]
async fn test_ongoing_and_previous_lists_partition_bookings() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let clock = clock_at(Utc::now());

    let confirmed =
        confirmed_booking(&app, &clock, place.id, customer.id, day_after(&clock, 18)).await;
    let (pending, _) = create_booking(
        &app.state.db,
        &clock,
        booking_params(
            place.id,
            customer.id,
            day_after(&clock, 19),
            time(10, 0),
            time(12, 0),
            2,
        ),
    )
    .await
    .unwrap();
    let stale_clock = clock_at(Utc::now() - Duration::hours(3));
    let (lapsed, _) = create_booking(
        &app.state.db,
        &stale_clock,
        booking_params(
            place.id,
            customer.id,
            day_after(&stale_clock, 20),
            time(10, 0),
            time(12, 0),
            2,
        ),
    )
    .await
    .unwrap();

    let ongoing: Vec<Uuid> = list_ongoing(&app.state.db, &clock, customer.id)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(ongoing.len(), 2);
    assert!(ongoing.contains(&confirmed.id));
    assert!(ongoing.contains(&pending.id));

    let page = PageRequest {
        page: 1,
        limit: 10,
    };
    let (previous, total) = list_previous(&app.state.db, &clock, customer.id, page)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(previous[0].id, lapsed.id);
}

#[tokio::test]
async fn test_owner_booking_list_filters_and_pages_newest_first() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let now = Utc::now();

    let mut created = Vec::new();
    for (i, minutes_ago) in [30, 20, 10, 0].into_iter().enumerate() {
        let clock = clock_at(now - Duration::minutes(minutes_ago));
        let (booking, _) = create_booking(
            &app.state.db,
            &clock,
            booking_params(
                place.id,
                customer.id,
                day_after(&clock, 21 + i as i64),
                time(10, 0),
                time(12, 0),
                2,
            ),
        )
        .await
        .unwrap();
        created.push(booking);
    }
    let clock = clock_at(now);
    for booking in [&created[0], &created[2]] {
        let outcome =
            handle_invoice_callback(&app.state.db, &clock, paid(booking, booking.total_price))
                .await
                .unwrap();
        assert_eq!(outcome, CallbackOutcome::Confirmed);
    }
    let newest_first: Vec<Uuid> = created.iter().rev().map(|b| b.id).collect();
    let page = |page, limit| PageRequest { page, limit };

    let (rows, total) = list_for_owner(&app.state.db, owner.id, place.id, None, page(1, 10))
        .await
        .unwrap();
    assert_eq!(total, 4);
    assert_eq!(rows.iter().map(|b| b.id).collect::<Vec<_>>(), newest_first);

    let (rows, total) = list_for_owner(
        &app.state.db,
        owner.id,
        place.id,
        Some(BookingStatus::Confirmed),
        page(1, 10),
    )
    .await
    .unwrap();
    assert_eq!(total, 2);
    assert_eq!(
        rows.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![created[2].id, created[0].id]
    );
    assert!(rows.iter().all(|b| b.status == BookingStatus::Confirmed));

    let (rows, total) = list_for_owner(
        &app.state.db,
        owner.id,
        place.id,
        Some(BookingStatus::AwaitingPayment),
        page(1, 10),
    )
    .await
    .unwrap();
    assert_eq!(total, 2);
    assert_eq!(
        rows.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![created[3].id, created[1].id]
    );

    let (first, first_total) =
        list_for_owner(&app.state.db, owner.id, place.id, None, page(1, 3))
            .await
            .unwrap();
    let (second, second_total) =
        list_for_owner(&app.state.db, owner.id, place.id, None, page(2, 3))
            .await
            .unwrap();
    assert_eq!((first.len(), second.len()), (3, 1));
    assert_eq!(first_total, 4);
    assert_eq!(second_total, 4);
    let paged: Vec<Uuid> = first.iter().chain(&second).map(|b| b.id).collect();
    assert_eq!(paged, newest_first);

    let stranger = create_owner(&app).await;
    let err = list_for_owner(&app.state.db, stranger.id, place.id, None, page(1, 10))
        .await
        .expect_err("Only the place owner may list its bookings");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}
