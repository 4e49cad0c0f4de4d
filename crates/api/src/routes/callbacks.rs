//! Payment provider webhooks. Anything that passes the token check is
//! acknowledged with 200, even when it matches nothing, so the provider
//! stops retrying.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::domains::lifecycle::service::{self as lifecycle, InvoiceCallback, InvoiceStatus};
use crate::domains::payout::service::{self as payout, DisbursementCallback};
use crate::error::AppError;
use crate::response::{ok, ApiResponse};
use crate::state::AppState;

const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

/// Compares digests so the check does not leak a matching prefix.
fn verify_callback_token(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let provided = headers
        .get(CALLBACK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("Missing callback token".into()))?;

    if Sha256::digest(provided.as_bytes()) != Sha256::digest(expected.as_bytes()) {
        warn!("Rejected callback with invalid token");
        return Err(AppError::Unauthenticated("Invalid callback token".into()));
    }
    Ok(())
}

/// Whole rupiah from a JSON number; fractional or out-of-range values give `None`.
fn whole_amount(number: &Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub outcome: String,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceCallbackBody {
    pub id: String,
    #[serde(default)]
    pub external_id: String,
    pub status: String,
    pub amount: Option<Number>,
    pub paid_amount: Option<Number>,
}

pub async fn invoice_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<InvoiceCallbackBody>, JsonRejection>,
) -> Result<ApiResponse<CallbackAck>, AppError> {
    verify_callback_token(&headers, &state.config().xendit_callback_token)?;
    let Json(body) = body?;

    let amount = body
        .paid_amount
        .as_ref()
        .or(body.amount.as_ref())
        .and_then(whole_amount);

    let outcome = lifecycle::handle_invoice_callback(
        &state.db,
        &state.clock(),
        InvoiceCallback {
            invoice_id: body.id,
            external_id: body.external_id,
            status: InvoiceStatus::parse(&body.status),
            amount,
        },
    )
    .await?;

    Ok(ok(
        "Callback processed",
        CallbackAck {
            outcome: format!("{outcome:?}"),
        },
    ))
}

#[derive(Debug, Deserialize)]
pub struct DisbursementCallbackBody {
    pub id: String,
    #[serde(default)]
    pub external_id: String,
    pub status: String,
    pub amount: Option<Number>,
    pub failure_code: Option<String>,
}

pub async fn disbursement_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<DisbursementCallbackBody>, JsonRejection>,
) -> Result<ApiResponse<CallbackAck>, AppError> {
    verify_callback_token(&headers, &state.config().xendit_callback_token)?;
    let Json(body) = body?;

    let outcome = payout::handle_disbursement_callback(
        &state.db,
        &state.clock(),
        DisbursementCallback {
            disbursement_id: body.id,
            external_id: body.external_id,
            status: body.status,
            amount: body.amount.as_ref().and_then(whole_amount),
            failure_code: body.failure_code,
        },
    )
    .await?;

    Ok(ok(
        "Callback processed",
        CallbackAck {
            outcome: format!("{outcome:?}"),
        },
    ))
}
