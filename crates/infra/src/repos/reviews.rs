use sqlx::{PgExecutor, Result};
use uuid::Uuid;

use crate::{models::ReviewRow, pagination::LimitOffset};

#[derive(Debug, Clone)]
pub struct CreateReview {
    pub user_id: Uuid,
    pub place_id: Uuid,
    pub booking_id: Uuid,
    pub rating: i16,
    pub content: String,
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, data: CreateReview) -> Result<ReviewRow> {
    sqlx::query_as::<_, ReviewRow>(
        r#"
        INSERT INTO reviews (user_id, place_id, booking_id, rating, content)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, place_id, booking_id, rating, content, created_at
        "#,
    )
    .bind(data.user_id)
    .bind(data.place_id)
    .bind(data.booking_id)
    .bind(data.rating)
    .bind(data.content)
    .fetch_one(executor)
    .await
}

pub async fn list_by_place<'e>(
    executor: impl PgExecutor<'e>,
    place_id: Uuid,
    page: LimitOffset,
) -> Result<Vec<ReviewRow>> {
    sqlx::query_as::<_, ReviewRow>(
        r#"
        SELECT id, user_id, place_id, booking_id, rating, content, created_at
        FROM reviews
        WHERE place_id = $1
        ORDER BY created_at DESC, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(place_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(executor)
    .await
}

pub async fn count_by_place<'e>(executor: impl PgExecutor<'e>, place_id: Uuid) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE place_id = $1")
        .bind(place_id)
        .fetch_one(executor)
        .await?;
    Ok(row.0)
}
