use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use super::payment::{
    DisbursementReceipt, DisbursementRequest, GatewayError, Invoice, InvoiceRequest,
    PaymentGateway,
};

#[derive(Clone)]
pub struct XenditClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct InvoiceResponse {
    id: String,
    invoice_url: String,
}

#[derive(Deserialize)]
struct DisbursementResponse {
    id: String,
}

impl XenditClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        // Secret key as username, empty password.
        let auth_header = format!("Basic {}", STANDARD.encode(format!("{api_key}:")));

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            client,
        })
    }

    async fn post(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
        idempotency_key: Option<&str>,
    ) -> Result<reqwest::Response, GatewayError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", &self.auth_header);
        if let Some(key) = idempotency_key {
            request = request.header("X-IDEMPOTENCY-KEY", key);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::ApiError { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl PaymentGateway for XenditClient {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, GatewayError> {
        let items: Vec<_> = request
            .lines
            .iter()
            .map(|l| json!({ "name": l.name, "quantity": l.quantity, "price": l.price }))
            .collect();

        let body = json!({
            "external_id": request.external_id,
            "amount": request.amount,
            "payer_email": request.payer_email,
            "description": request.description,
            "invoice_duration": request.duration_seconds,
            "currency": "IDR",
            "payment_methods": request.payment_methods,
            "items": items,
        });

        let invoice: InvoiceResponse = self.post("/v2/invoices", Some(body), None).await?.json().await?;
        info!(external_id = %request.external_id, invoice_id = %invoice.id, "Invoice created");

        Ok(Invoice {
            id: invoice.id,
            invoice_url: invoice.invoice_url,
        })
    }

    async fn expire_invoice(&self, invoice_id: &str) -> Result<(), GatewayError> {
        self.post(&format!("/invoices/{invoice_id}/expire!"), None, None)
            .await?;
        info!(invoice_id = %invoice_id, "Invoice expired at provider");
        Ok(())
    }

    async fn create_disbursement(
        &self,
        request: DisbursementRequest,
    ) -> Result<DisbursementReceipt, GatewayError> {
        let body = json!({
            "external_id": request.external_id,
            "amount": request.amount,
            "bank_code": request.bank_code,
            "account_holder_name": request.account_holder_name,
            "account_number": request.account_number,
            "description": request.description,
        });

        let receipt: DisbursementResponse = self
            .post("/disbursements", Some(body), Some(&request.external_id))
            .await?
            .json()
            .await?;
        info!(external_id = %request.external_id, disbursement_id = %receipt.id, "Disbursement requested");

        Ok(DisbursementReceipt { id: receipt.id })
    }
}
