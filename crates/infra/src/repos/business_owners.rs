use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Result};
use uuid::Uuid;

use crate::models::BusinessOwnerRow;

const OWNER_COLUMNS: &str = "user_id, bank_code, account_number, account_holder_name, \
     balance_available, last_disbursement_date, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CreateBusinessOwner {
    pub user_id: Uuid,
    pub bank_code: String,
    pub account_number: String,
    pub account_holder_name: String,
}

pub async fn get<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Option<BusinessOwnerRow>> {
    sqlx::query_as::<_, BusinessOwnerRow>(&format!(
        "SELECT {OWNER_COLUMNS} FROM business_owners WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Row-lock the owner so balance checks and payout reservations serialise.
pub async fn get_for_update<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Option<BusinessOwnerRow>> {
    sqlx::query_as::<_, BusinessOwnerRow>(&format!(
        "SELECT {OWNER_COLUMNS} FROM business_owners WHERE user_id = $1 FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn create<'e>(
    executor: impl PgExecutor<'e>,
    data: CreateBusinessOwner,
) -> Result<BusinessOwnerRow> {
    sqlx::query_as::<_, BusinessOwnerRow>(&format!(
        "INSERT INTO business_owners (user_id, bank_code, account_number, account_holder_name)
         VALUES ($1, $2, $3, $4)
         RETURNING {OWNER_COLUMNS}"
    ))
    .bind(data.user_id)
    .bind(data.bank_code)
    .bind(data.account_number)
    .bind(data.account_holder_name)
    .fetch_one(executor)
    .await
}

pub async fn credit<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    amount: i64,
) -> Result<BusinessOwnerRow> {
    sqlx::query_as::<_, BusinessOwnerRow>(&format!(
        "UPDATE business_owners
         SET balance_available = balance_available + $2, updated_at = NOW()
         WHERE user_id = $1
         RETURNING {OWNER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(amount)
    .fetch_one(executor)
    .await
}

/// Settle a completed payout against the available balance.
pub async fn debit_for_disbursement<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    amount: i64,
    disbursed_at: DateTime<Utc>,
) -> Result<BusinessOwnerRow> {
    sqlx::query_as::<_, BusinessOwnerRow>(&format!(
        "UPDATE business_owners
         SET balance_available = balance_available - $2,
             last_disbursement_date = $3,
             updated_at = NOW()
         WHERE user_id = $1
         RETURNING {OWNER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(amount)
    .bind(disbursed_at)
    .fetch_one(executor)
    .await
}
