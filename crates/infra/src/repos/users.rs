use sqlx::{PgExecutor, Result};
use uuid::Uuid;

use crate::models::UserRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    BusinessAdmin,
}

#[derive(Debug, Clone)]
pub struct CreateUserData {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

pub async fn get_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, email, name, phone, role, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, data: CreateUserData) -> Result<UserRow> {
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, email, name, phone, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, email, name, phone, role, created_at, updated_at
        "#,
    )
    .bind(data.id)
    .bind(data.email)
    .bind(data.name)
    .bind(data.phone)
    .bind(data.role)
    .fetch_one(executor)
    .await
}

pub async fn is_customer<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<bool> {
    let row: (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM customers WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(executor)
            .await?;
    Ok(row.0)
}

pub async fn create_customer<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<()> {
    sqlx::query("INSERT INTO customers (user_id) VALUES ($1)")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}
