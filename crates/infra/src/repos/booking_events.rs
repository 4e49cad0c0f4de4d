use crate::models::BookingEventRow;
use sqlx::{PgExecutor, Result as SqlxResult};
use uuid::Uuid;

/// Append an audit entry. `booking_id` is `None` for events that could not
/// be matched to a booking (e.g. an unknown payment callback).
pub async fn log_event<'e>(
    executor: impl PgExecutor<'e>,
    booking_id: Option<Uuid>,
    event_category: &str,
    event_action: &str,
    actor_id: Option<Uuid>,
    metadata: serde_json::Value,
) -> SqlxResult<BookingEventRow> {
    sqlx::query_as::<_, BookingEventRow>(
        "INSERT INTO booking_events
         (booking_id, event_category, event_action, actor_id, metadata)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, booking_id, event_category, event_action, actor_id, metadata, event_time",
    )
    .bind(booking_id)
    .bind(event_category)
    .bind(event_action)
    .bind(actor_id)
    .bind(metadata)
    .fetch_one(executor)
    .await
}

/// Events for a booking, newest first.
pub async fn list_by_booking<'e>(
    executor: impl PgExecutor<'e>,
    booking_id: Uuid,
) -> SqlxResult<Vec<BookingEventRow>> {
    sqlx::query_as::<_, BookingEventRow>(
        "SELECT id, booking_id, event_category, event_action, actor_id, metadata, event_time
         FROM booking_events
         WHERE booking_id = $1
         ORDER BY event_time DESC",
    )
    .bind(booking_id)
    .fetch_all(executor)
    .await
}
