//! Narrow interface to the payment provider. Invoices collect customer
//! payments; disbursements pay owners out.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AppError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Gateway timed out")]
    Timeout,
    #[error("API error (status {status}): {body}")]
    ApiError { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        tracing::warn!(error = %err, "Payment gateway call failed");
        AppError::DependencyUnavailable("Payment provider is unavailable".into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceLine {
    pub name: String,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRequest {
    /// Our booking id; echoed back on callbacks.
    pub external_id: String,
    pub amount: i64,
    pub payer_email: String,
    pub description: String,
    pub duration_seconds: i64,
    pub payment_methods: Vec<String>,
    pub lines: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub id: String,
    pub invoice_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisbursementRequest {
    /// Our disbursement id; also the idempotency key.
    pub external_id: String,
    pub amount: i64,
    pub bank_code: String,
    pub account_holder_name: String,
    pub account_number: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisbursementReceipt {
    pub id: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, GatewayError>;

    async fn expire_invoice(&self, invoice_id: &str) -> Result<(), GatewayError>;

    async fn create_disbursement(
        &self,
        request: DisbursementRequest,
    ) -> Result<DisbursementReceipt, GatewayError>;
}
