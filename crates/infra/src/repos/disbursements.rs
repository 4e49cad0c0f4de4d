use sqlx::{PgExecutor, Result};
use std::str::FromStr;
use uuid::Uuid;

use crate::{models::DisbursementRow, pagination::LimitOffset};

const DISBURSEMENT_COLUMNS: &str =
    "id, owner_id, amount, status, external_reference, failure_code, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "disbursement_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisbursementStatus {
    Pending,
    Completed,
    Failed,
}

impl DisbursementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisbursementStatus::Pending => "pending",
            DisbursementStatus::Completed => "completed",
            DisbursementStatus::Failed => "failed",
        }
    }
}

impl FromStr for DisbursementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DisbursementStatus::Pending),
            "completed" => Ok(DisbursementStatus::Completed),
            "failed" => Ok(DisbursementStatus::Failed),
            _ => Err(format!("Unknown disbursement status: {}", s)),
        }
    }
}

pub async fn create<'e>(
    executor: impl PgExecutor<'e>,
    owner_id: Uuid,
    amount: i64,
) -> Result<DisbursementRow> {
    sqlx::query_as::<_, DisbursementRow>(&format!(
        "INSERT INTO disbursements (owner_id, amount)
         VALUES ($1, $2)
         RETURNING {DISBURSEMENT_COLUMNS}"
    ))
    .bind(owner_id)
    .bind(amount)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<DisbursementRow>> {
    sqlx::query_as::<_, DisbursementRow>(&format!(
        "SELECT {DISBURSEMENT_COLUMNS} FROM disbursements WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn find_by_reference<'e>(
    executor: impl PgExecutor<'e>,
    reference: &str,
) -> Result<Option<DisbursementRow>> {
    sqlx::query_as::<_, DisbursementRow>(&format!(
        "SELECT {DISBURSEMENT_COLUMNS} FROM disbursements WHERE external_reference = $1"
    ))
    .bind(reference)
    .fetch_optional(executor)
    .await
}

pub async fn attach_reference<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    reference: &str,
) -> Result<()> {
    sqlx::query("UPDATE disbursements SET external_reference = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(reference)
        .execute(executor)
        .await?;
    Ok(())
}

/// Compare-and-set on status. Returns `None` when the payout is not in `from`.
pub async fn update_status<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    from: DisbursementStatus,
    to: DisbursementStatus,
    failure_code: Option<&str>,
) -> Result<Option<DisbursementRow>> {
    sqlx::query_as::<_, DisbursementRow>(&format!(
        "UPDATE disbursements
         SET status = $3, failure_code = COALESCE($4, failure_code), updated_at = NOW()
         WHERE id = $1 AND status = $2
         RETURNING {DISBURSEMENT_COLUMNS}"
    ))
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(failure_code)
    .fetch_optional(executor)
    .await
}

/// Sum of payouts still in flight for an owner.
pub async fn pending_total<'e>(executor: impl PgExecutor<'e>, owner_id: Uuid) -> Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0)::bigint FROM disbursements
         WHERE owner_id = $1 AND status = 'pending'",
    )
    .bind(owner_id)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

pub async fn list_by_owner<'e>(
    executor: impl PgExecutor<'e>,
    owner_id: Uuid,
    page: LimitOffset,
) -> Result<Vec<DisbursementRow>> {
    sqlx::query_as::<_, DisbursementRow>(&format!(
        "SELECT {DISBURSEMENT_COLUMNS}
         FROM disbursements
         WHERE owner_id = $1
         ORDER BY created_at DESC, id
         LIMIT $2 OFFSET $3"
    ))
    .bind(owner_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(executor)
    .await
}

pub async fn count_by_owner<'e>(executor: impl PgExecutor<'e>, owner_id: Uuid) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM disbursements WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(executor)
        .await?;
    Ok(row.0)
}
