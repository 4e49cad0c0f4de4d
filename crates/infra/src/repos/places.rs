use sqlx::{PgExecutor, Result};
use uuid::Uuid;

use crate::{
    models::{PlaceRow, PlaceSummaryRow},
    pagination::LimitOffset,
};

const PLACE_COLUMNS: &str = "id, owner_id, name, description, address, city, image_url, \
     ticket_price, open_hour, close_hour, slot_interval_minutes, capacity, \
     min_slot_count, max_slot_count, min_interval_days, max_interval_days, \
     lat, long, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CreatePlaceData {
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub image_url: Option<String>,
    pub ticket_price: i64,
    pub open_hour: i32,
    pub close_hour: i32,
    pub slot_interval_minutes: i32,
    pub capacity: i32,
    pub min_slot_count: i32,
    pub max_slot_count: i32,
    pub min_interval_days: i32,
    pub max_interval_days: i32,
    pub lat: f64,
    pub long: f64,
}

pub async fn get_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<PlaceRow>> {
    sqlx::query_as::<_, PlaceRow>(&format!("SELECT {PLACE_COLUMNS} FROM places WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Take the per-place admission lock. Every admission and late-payment
/// recheck for the same place serialises on this row.
pub async fn lock_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<PlaceRow>> {
    sqlx::query_as::<_, PlaceRow>(&format!(
        "SELECT {PLACE_COLUMNS} FROM places WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn get_owner_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT owner_id FROM places WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|r| r.0))
}

pub async fn list_summaries<'e>(
    executor: impl PgExecutor<'e>,
    page: LimitOffset,
) -> Result<Vec<PlaceSummaryRow>> {
    sqlx::query_as::<_, PlaceSummaryRow>(
        r#"
        SELECT p.id, p.name, p.address, p.city, p.image_url, p.ticket_price,
               AVG(r.rating)::float8 AS rating_average,
               COUNT(r.id) AS rating_count
        FROM places p
        LEFT JOIN reviews r ON r.place_id = p.id
        GROUP BY p.id
        ORDER BY p.created_at DESC, p.id
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(executor)
    .await
}

pub async fn count<'e>(executor: impl PgExecutor<'e>) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM places")
        .fetch_one(executor)
        .await?;
    Ok(row.0)
}

/// Average rating and number of reviews for one place.
pub async fn rating_summary<'e>(
    executor: impl PgExecutor<'e>,
    place_id: Uuid,
) -> Result<(Option<f64>, i64)> {
    sqlx::query_as(
        "SELECT AVG(rating)::float8, COUNT(*) FROM reviews WHERE place_id = $1",
    )
    .bind(place_id)
    .fetch_one(executor)
    .await
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, data: CreatePlaceData) -> Result<PlaceRow> {
    sqlx::query_as::<_, PlaceRow>(&format!(
        "INSERT INTO places (owner_id, name, description, address, city, image_url,
                             ticket_price, open_hour, close_hour, slot_interval_minutes,
                             capacity, min_slot_count, max_slot_count,
                             min_interval_days, max_interval_days, lat, long)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
         RETURNING {PLACE_COLUMNS}"
    ))
    .bind(data.owner_id)
    .bind(data.name)
    .bind(data.description)
    .bind(data.address)
    .bind(data.city)
    .bind(data.image_url)
    .bind(data.ticket_price)
    .bind(data.open_hour)
    .bind(data.close_hour)
    .bind(data.slot_interval_minutes)
    .bind(data.capacity)
    .bind(data.min_slot_count)
    .bind(data.max_slot_count)
    .bind(data.min_interval_days)
    .bind(data.max_interval_days)
    .bind(data.lat)
    .bind(data.long)
    .fetch_one(executor)
    .await
}
