use chrono::{DateTime, Utc};
use infra::{
    db::Db,
    models::DisbursementRow,
    repos::{booking_events, business_owners, disbursements, DisbursementStatus},
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::BusinessAdminProfile;
use crate::domains::clock::VenueClock;
use crate::error::AppError;
use crate::gateways::{DisbursementRequest, PaymentGateway};
use crate::response::PageRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// What the owner can still withdraw.
    pub balance: i64,
    pub balance_available: i64,
    pub pending_disbursement: i64,
    pub last_disbursement_date: Option<DateTime<Utc>>,
}

pub async fn get_balance(db: &Db, owner_id: Uuid) -> Result<Balance, AppError> {
    let owner = business_owners::get(db, owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Business owner not found".into()))?;
    let pending = disbursements::pending_total(db, owner_id).await?;

    Ok(Balance {
        balance: owner.balance_available - pending,
        balance_available: owner.balance_available,
        pending_disbursement: pending,
        last_disbursement_date: owner.last_disbursement_date,
    })
}

pub async fn list_disbursements(
    db: &Db,
    owner_id: Uuid,
    page: PageRequest,
) -> Result<(Vec<DisbursementRow>, i64), AppError> {
    let rows = disbursements::list_by_owner(db, owner_id, page.limit_offset()).await?;
    let total = disbursements::count_by_owner(db, owner_id).await?;
    Ok((rows, total))
}

/// Reserve `amount` as a pending payout and hand it to the provider.
///
/// The reservation is committed before the provider call; if the call fails
/// the payout is marked failed, which releases the reservation.
pub async fn request_disbursement(
    db: &Db,
    payments: &dyn PaymentGateway,
    owner: &BusinessAdminProfile,
    amount: i64,
) -> Result<DisbursementRow, AppError> {
    if amount <= 0 {
        return Err(AppError::invalid("amount must be positive"));
    }

    let mut tx = db.begin().await?;
    let row = business_owners::get_for_update(&mut *tx, owner.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Business owner not found".into()))?;
    let pending = disbursements::pending_total(&mut *tx, owner.id).await?;
    let withdrawable = row.balance_available - pending;
    if amount > withdrawable {
        return Err(AppError::invalid(format!(
            "amount exceeds withdrawable balance of {withdrawable}"
        )));
    }

    let disbursement = disbursements::create(&mut *tx, owner.id, amount).await?;
    booking_events::log_event(
        &mut *tx,
        None,
        "disbursement",
        "requested",
        Some(owner.id),
        json!({ "disbursement_id": disbursement.id, "amount": amount }),
    )
    .await?;
    tx.commit().await?;

    let request = DisbursementRequest {
        external_id: disbursement.id.to_string(),
        amount,
        bank_code: row.bank_code,
        account_holder_name: row.account_holder_name,
        account_number: row.account_number,
        description: format!("Payout {}", disbursement.id),
    };

    match payments.create_disbursement(request).await {
        Ok(receipt) => {
            disbursements::attach_reference(db, disbursement.id, &receipt.id).await?;
            info!(disbursement_id = %disbursement.id, owner_id = %owner.id, amount, "Disbursement requested");
            disbursements::get_by_id(db, disbursement.id)
                .await?
                .ok_or_else(|| AppError::NotFound("Disbursement not found".into()))
        }
        Err(err) => {
            warn!(disbursement_id = %disbursement.id, error = %err, "Disbursement request failed");
            disbursements::update_status(
                db,
                disbursement.id,
                DisbursementStatus::Pending,
                DisbursementStatus::Failed,
                Some("GATEWAY_UNAVAILABLE"),
            )
            .await?;
            Err(err.into())
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisbursementCallback {
    pub disbursement_id: String,
    pub external_id: String,
    pub status: String,
    pub amount: Option<i64>,
    pub failure_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisbursementOutcome {
    Completed,
    Failed,
    Duplicate,
    Ignored,
}

async fn find_callback_disbursement(
    db: &Db,
    callback: &DisbursementCallback,
) -> Result<Option<DisbursementRow>, AppError> {
    if let Some(row) = disbursements::find_by_reference(db, &callback.disbursement_id).await? {
        return Ok(Some(row));
    }
    let Ok(id) = Uuid::parse_str(&callback.external_id) else {
        return Ok(None);
    };
    Ok(disbursements::get_by_id(db, id).await?)
}

async fn alert(db: &Db, action: &str, metadata: serde_json::Value) -> Result<(), AppError> {
    booking_events::log_event(db, None, "alert", action, None, metadata).await?;
    Ok(())
}

pub async fn handle_disbursement_callback(
    db: &Db,
    clock: &VenueClock,
    callback: DisbursementCallback,
) -> Result<DisbursementOutcome, AppError> {
    let Some(disbursement) = find_callback_disbursement(db, &callback).await? else {
        warn!(
            disbursement_id = %callback.disbursement_id,
            external_id = %callback.external_id,
            "Disbursement callback does not match any payout"
        );
        alert(
            db,
            "unmatched_disbursement_callback",
            json!({ "disbursement_id": callback.disbursement_id, "external_id": callback.external_id }),
        )
        .await?;
        return Ok(DisbursementOutcome::Ignored);
    };

    if callback.amount.is_some_and(|a| a != disbursement.amount) {
        error!(
            disbursement_id = %disbursement.id,
            expected = disbursement.amount,
            received = ?callback.amount,
            "Disbursement amount mismatch"
        );
        alert(
            db,
            "disbursement_amount_mismatch",
            json!({
                "disbursement_id": disbursement.id,
                "expected": disbursement.amount,
                "received": callback.amount,
            }),
        )
        .await?;
        return Ok(DisbursementOutcome::Ignored);
    }

    match callback.status.to_ascii_uppercase().as_str() {
        "COMPLETED" => {
            let mut tx = db.begin().await?;
            let Some(completed) = disbursements::update_status(
                &mut *tx,
                disbursement.id,
                DisbursementStatus::Pending,
                DisbursementStatus::Completed,
                None,
            )
            .await?
            else {
                return Ok(DisbursementOutcome::Duplicate);
            };
            business_owners::debit_for_disbursement(
                &mut *tx,
                completed.owner_id,
                completed.amount,
                clock.now(),
            )
            .await?;
            booking_events::log_event(
                &mut *tx,
                None,
                "disbursement",
                "completed",
                None,
                json!({ "disbursement_id": completed.id, "amount": completed.amount }),
            )
            .await?;
            tx.commit().await?;

            info!(disbursement_id = %completed.id, amount = completed.amount, "Disbursement completed");
            Ok(DisbursementOutcome::Completed)
        }
        "FAILED" => {
            let code = callback.failure_code.as_deref().unwrap_or("UNKNOWN");
            let mut tx = db.begin().await?;
            let Some(failed) = disbursements::update_status(
                &mut *tx,
                disbursement.id,
                DisbursementStatus::Pending,
                DisbursementStatus::Failed,
                Some(code),
            )
            .await?
            else {
                return Ok(DisbursementOutcome::Duplicate);
            };
            booking_events::log_event(
                &mut *tx,
                None,
                "disbursement",
                "failed",
                None,
                json!({ "disbursement_id": failed.id, "failure_code": code }),
            )
            .await?;
            tx.commit().await?;

            warn!(disbursement_id = %failed.id, failure_code = code, "Disbursement failed");
            Ok(DisbursementOutcome::Failed)
        }
        other => {
            info!(disbursement_id = %disbursement.id, status = other, "Disbursement still pending");
            Ok(DisbursementOutcome::Ignored)
        }
    }
}
