mod common;

use api::domains::availability::service::{
    available_dates, available_times, DateRangeQuery, DayQuery,
};
use api::domains::booking::service::create_booking;
use chrono::{Duration, NaiveTime, Timelike, Utc};
use common::*;

fn range(place_id: uuid::Uuid, headcount: i32, slot_count: u32) -> DateRangeQuery {
    DateRangeQuery {
        place_id,
        start_date: None,
        end_date: None,
        headcount,
        slot_count,
    }
}

#[tokio::test]
async fn test_dates_are_clipped_to_booking_horizon() {
    let app = setup_test_db().await;
    let (_owner, place) = create_owned_place(
        &app,
        PlaceSetup {
            min_interval_days: 1,
            max_interval_days: 3,
            ..PlaceSetup::default()
        },
    )
    .await;
    let clock = clock_at(Utc::now());
    let horizon = vec![
        day_after(&clock, 1),
        day_after(&clock, 2),
        day_after(&clock, 3),
    ];

    let dates = available_dates(&app.state.db, &clock, range(place.id, 2, 1))
        .await
        .unwrap();
    assert_eq!(dates, horizon);

    let wide = DateRangeQuery {
        start_date: Some(day_after(&clock, -5)),
        end_date: Some(day_after(&clock, 40)),
        ..range(place.id, 2, 1)
    };
    let dates = available_dates(&app.state.db, &clock, wide).await.unwrap();
    assert_eq!(dates, horizon);

    let single = DateRangeQuery {
        start_date: Some(day_after(&clock, 2)),
        end_date: Some(day_after(&clock, 2)),
        ..range(place.id, 2, 1)
    };
    let dates = available_dates(&app.state.db, &clock, single).await.unwrap();
    assert_eq!(dates, vec![day_after(&clock, 2)]);

    let beyond = DateRangeQuery {
        start_date: Some(day_after(&clock, 10)),
        end_date: Some(day_after(&clock, 12)),
        ..range(place.id, 2, 1)
    };
    let dates = available_dates(&app.state.db, &clock, beyond).await.unwrap();
    assert!(dates.is_empty());
}

#[tokio::test]
async fn test_fully_booked_date_is_dropped() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(
        &app,
        PlaceSetup {
            capacity: 2,
            open_hour: 8,
            close_hour: 10,
            min_slot_count: 1,
            max_slot_count: 2,
            ..PlaceSetup::default()
        },
    )
    .await;
    let clock = clock_at(Utc::now());
    let full = day_after(&clock, 12);

    create_booking(
        &app.state.db,
        &clock,
        booking_params(place.id, customer.id, full, time(8, 0), time(10, 0), 2),
    )
    .await
    .expect("Booking should be admitted");

    let query = DateRangeQuery {
        start_date: Some(day_after(&clock, 11)),
        end_date: Some(day_after(&clock, 13)),
        ..range(place.id, 1, 1)
    };
    let dates = available_dates(&app.state.db, &clock, query).await.unwrap();
    assert_eq!(dates, vec![day_after(&clock, 11), day_after(&clock, 13)]);
}

#[tokio::test]
async fn test_today_is_dropped_after_closing() {
    let app = setup_test_db().await;
    let (_owner, place) = create_owned_place(
        &app,
        PlaceSetup {
            max_interval_days: 2,
            ..PlaceSetup::default()
        },
    )
    .await;
    let today = clock_at(Utc::now()).today();
    // 21:00 local, an hour after the place closes.
    let evening = today.and_hms_opt(21, 0, 0).unwrap().and_utc()
        - Duration::minutes(WIB_OFFSET_MINUTES.into());
    let clock = clock_at(evening);
    assert_eq!(clock.today(), today);

    let dates = available_dates(&app.state.db, &clock, range(place.id, 1, 1))
        .await
        .unwrap();
    assert_eq!(dates, vec![day_after(&clock, 1), day_after(&clock, 2)]);
}

#[tokio::test]
async fn test_day_windows_are_grouped_by_slot_count() {
    let app = setup_test_db().await;
    let customer = create_customer(&app).await;
    let (_owner, place) = create_owned_place(&app, PlaceSetup::default()).await;
    let clock = clock_at(Utc::now());
    let date = day_after(&clock, 12);

    create_booking(
        &app.state.db,
        &clock,
        booking_params(place.id, customer.id, date, time(10, 0), time(12, 0), 4),
    )
    .await
    .expect("Booking should be admitted");

    let day = available_times(
        &app.state.db,
        &clock,
        DayQuery {
            place_id: place.id,
            date,
            headcount: 7,
            slot_count: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(day.date, date);
    assert_eq!(day.slots.len(), 12);
    let remaining_at = |t: NaiveTime| {
        day.slots
            .iter()
            .find(|s| s.start_time == t)
            .map(|s| s.remaining_capacity)
    };
    assert_eq!(remaining_at(time(8, 0)), Some(10));
    assert_eq!(remaining_at(time(10, 0)), Some(6));
    assert_eq!(remaining_at(time(11, 0)), Some(6));

    assert_eq!(day.windows.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    for (slot_count, windows) in &day.windows {
        for w in windows {
            let hours = w.end_time.hour() - w.start_time.hour();
            assert_eq!(hours, *slot_count);
            assert!(w.remaining_capacity >= 7);
        }
    }
    // The 10:00-12:00 hold leaves room for six, so seven cannot sit there.
    assert_eq!(day.windows[&1].len(), 10);
    assert!(day.windows[&1]
        .iter()
        .all(|w| w.start_time != time(10, 0) && w.start_time != time(11, 0)));
    assert_eq!(day.windows[&4].first().map(|w| w.start_time), Some(time(12, 0)));
    assert_eq!(day.windows[&4].len(), 5);

    let pairs = available_times(
        &app.state.db,
        &clock,
        DayQuery {
            place_id: place.id,
            date,
            headcount: 7,
            slot_count: Some(2),
        },
    )
    .await
    .unwrap();
    assert_eq!(pairs.windows.keys().copied().collect::<Vec<_>>(), vec![2]);
    assert_eq!(pairs.slots, day.slots);
}
