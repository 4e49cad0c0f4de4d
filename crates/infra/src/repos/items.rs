use sqlx::{PgExecutor, Result};
use uuid::Uuid;

use crate::models::ItemRow;

#[derive(Debug, Clone)]
pub struct CreateItemData {
    pub place_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: Option<String>,
}

pub async fn list_by_place<'e>(
    executor: impl PgExecutor<'e>,
    place_id: Uuid,
) -> Result<Vec<ItemRow>> {
    sqlx::query_as::<_, ItemRow>(
        r#"
        SELECT id, place_id, name, description, price, image_url, created_at, updated_at
        FROM items
        WHERE place_id = $1
        ORDER BY name ASC
        "#,
    )
    .bind(place_id)
    .fetch_all(executor)
    .await
}

/// Fetch the given items regardless of place; callers check ownership.
pub async fn get_many<'e>(executor: impl PgExecutor<'e>, ids: &[Uuid]) -> Result<Vec<ItemRow>> {
    sqlx::query_as::<_, ItemRow>(
        r#"
        SELECT id, place_id, name, description, price, image_url, created_at, updated_at
        FROM items
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(executor)
    .await
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, data: CreateItemData) -> Result<ItemRow> {
    sqlx::query_as::<_, ItemRow>(
        r#"
        INSERT INTO items (place_id, name, description, price, image_url)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, place_id, name, description, price, image_url, created_at, updated_at
        "#,
    )
    .bind(data.place_id)
    .bind(data.name)
    .bind(data.description)
    .bind(data.price)
    .bind(data.image_url)
    .fetch_one(executor)
    .await
}
