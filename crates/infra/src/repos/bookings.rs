use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{PgExecutor, Result};
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    models::{BookingItemRow, BookingRow, OccupancyRow},
    pagination::LimitOffset,
};

const BOOKING_COLUMNS: &str = "id, place_id, user_id, date, start_time, end_time, headcount, \
     status, total_price_ticket, total_price_item, total_fee, total_price, \
     payment_reference, payment_url, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    AwaitingPayment,
    Confirmed,
    Fulfilled,
    Reviewed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::AwaitingPayment => "awaiting_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Fulfilled => "fulfilled",
            BookingStatus::Reviewed => "reviewed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_payment" => Ok(BookingStatus::AwaitingPayment),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "fulfilled" => Ok(BookingStatus::Fulfilled),
            "reviewed" => Ok(BookingStatus::Reviewed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "expired" => Ok(BookingStatus::Expired),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub headcount: i32,
    pub total_price_ticket: i64,
    pub total_price_item: i64,
    pub total_fee: i64,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateBookingItem {
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, data: CreateBooking) -> Result<BookingRow> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "INSERT INTO bookings (place_id, user_id, date, start_time, end_time, headcount,
                               total_price_ticket, total_price_item, total_fee, total_price,
                               created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(data.place_id)
    .bind(data.user_id)
    .bind(data.date)
    .bind(data.start_time)
    .bind(data.end_time)
    .bind(data.headcount)
    .bind(data.total_price_ticket)
    .bind(data.total_price_item)
    .bind(data.total_fee)
    .bind(data.total_price)
    .bind(data.created_at)
    .fetch_one(executor)
    .await
}

pub async fn insert_items<'e>(
    executor: impl PgExecutor<'e>,
    booking_id: Uuid,
    items: &[CreateBookingItem],
) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }

    let mut query = sqlx::QueryBuilder::new(
        "INSERT INTO booking_items (booking_id, item_id, quantity, unit_price, line_total) ",
    );
    query.push_values(items, |mut row, item| {
        row.push_bind(booking_id)
            .push_bind(item.item_id)
            .push_bind(item.quantity)
            .push_bind(item.unit_price)
            .push_bind(item.line_total);
    });
    query.build().execute(executor).await?;
    Ok(())
}

pub async fn get_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn find_by_payment_reference<'e>(
    executor: impl PgExecutor<'e>,
    reference: &str,
) -> Result<Option<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_reference = $1"
    ))
    .bind(reference)
    .fetch_optional(executor)
    .await
}

pub async fn list_items<'e>(
    executor: impl PgExecutor<'e>,
    booking_id: Uuid,
) -> Result<Vec<BookingItemRow>> {
    sqlx::query_as::<_, BookingItemRow>(
        r#"
        SELECT bi.booking_id, bi.item_id, i.name AS item_name,
               bi.quantity, bi.unit_price, bi.line_total
        FROM booking_items bi
        JOIN items i ON i.id = bi.item_id
        WHERE bi.booking_id = $1
        ORDER BY i.name ASC
        "#,
    )
    .bind(booking_id)
    .fetch_all(executor)
    .await
}

/// Bookings holding capacity at a place between two dates (inclusive).
///
/// A booking holds capacity while it is confirmed or fulfilled (reviewed
/// bookings were fulfilled), or while it awaits payment and was created
/// after `hold_cutoff`.
pub async fn list_occupying<'e>(
    executor: impl PgExecutor<'e>,
    place_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
    hold_cutoff: DateTime<Utc>,
) -> Result<Vec<OccupancyRow>> {
    sqlx::query_as::<_, OccupancyRow>(
        r#"
        SELECT id, date, start_time, end_time, headcount
        FROM bookings
        WHERE place_id = $1
          AND date BETWEEN $2 AND $3
          AND (
            status IN ('confirmed', 'fulfilled', 'reviewed')
            OR (status = 'awaiting_payment' AND created_at > $4)
          )
        ORDER BY date, start_time
        "#,
    )
    .bind(place_id)
    .bind(from)
    .bind(to)
    .bind(hold_cutoff)
    .fetch_all(executor)
    .await
}

/// Compare-and-set on status. Returns `None` when the booking is not in `from`.
pub async fn update_status<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    from: BookingStatus,
    to: BookingStatus,
) -> Result<Option<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "UPDATE bookings
         SET status = $3, updated_at = NOW()
         WHERE id = $1 AND status = $2
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(id)
    .bind(from)
    .bind(to)
    .fetch_optional(executor)
    .await
}

pub async fn attach_payment_reference<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    reference: &str,
    payment_url: &str,
) -> Result<Option<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "UPDATE bookings
         SET payment_reference = $2, payment_url = $3, updated_at = NOW()
         WHERE id = $1
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(id)
    .bind(reference)
    .bind(payment_url)
    .fetch_optional(executor)
    .await
}

pub async fn list_for_place<'e>(
    executor: impl PgExecutor<'e>,
    place_id: Uuid,
    status: Option<BookingStatus>,
    page: LimitOffset,
) -> Result<Vec<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS}
         FROM bookings
         WHERE place_id = $1 AND ($2::booking_status IS NULL OR status = $2)
         ORDER BY created_at DESC, id
         LIMIT $3 OFFSET $4"
    ))
    .bind(place_id)
    .bind(status)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(executor)
    .await
}

pub async fn count_for_place<'e>(
    executor: impl PgExecutor<'e>,
    place_id: Uuid,
    status: Option<BookingStatus>,
) -> Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM bookings
         WHERE place_id = $1 AND ($2::booking_status IS NULL OR status = $2)",
    )
    .bind(place_id)
    .bind(status)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Customer bookings still in play: confirmed, or awaiting payment within the hold.
pub async fn list_ongoing_for_customer<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    hold_cutoff: DateTime<Utc>,
) -> Result<Vec<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS}
         FROM bookings
         WHERE user_id = $1
           AND (status = 'confirmed' OR (status = 'awaiting_payment' AND created_at > $2))
         ORDER BY created_at DESC, id"
    ))
    .bind(user_id)
    .bind(hold_cutoff)
    .fetch_all(executor)
    .await
}

/// Everything not returned by [`list_ongoing_for_customer`].
pub async fn list_previous_for_customer<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    hold_cutoff: DateTime<Utc>,
    page: LimitOffset,
) -> Result<Vec<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS}
         FROM bookings
         WHERE user_id = $1
           AND NOT (status = 'confirmed' OR (status = 'awaiting_payment' AND created_at > $2))
         ORDER BY created_at DESC, id
         LIMIT $3 OFFSET $4"
    ))
    .bind(user_id)
    .bind(hold_cutoff)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(executor)
    .await
}

pub async fn count_previous_for_customer<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    hold_cutoff: DateTime<Utc>,
) -> Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM bookings
         WHERE user_id = $1
           AND NOT (status = 'confirmed' OR (status = 'awaiting_payment' AND created_at > $2))",
    )
    .bind(user_id)
    .bind(hold_cutoff)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Expire every hold created at or before `hold_cutoff`; returns the expired ids.
pub async fn expire_stale<'e>(
    executor: impl PgExecutor<'e>,
    hold_cutoff: DateTime<Utc>,
) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE bookings
        SET status = 'expired', updated_at = NOW()
        WHERE status = 'awaiting_payment' AND created_at <= $1
        RETURNING id
        "#,
    )
    .bind(hold_cutoff)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Confirmed bookings whose scheduled end (venue-local) is at or before `local_now`.
pub async fn list_ended_confirmed<'e>(
    executor: impl PgExecutor<'e>,
    local_now: NaiveDateTime,
    limit: i64,
) -> Result<Vec<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS}
         FROM bookings
         WHERE status = 'confirmed' AND (date + end_time) <= $1
         ORDER BY date, end_time
         LIMIT $2"
    ))
    .bind(local_now)
    .bind(limit)
    .fetch_all(executor)
    .await
}
