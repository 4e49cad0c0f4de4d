pub mod payment;
pub mod xendit;

pub use payment::{
    DisbursementReceipt, DisbursementRequest, GatewayError, Invoice, InvoiceLine, InvoiceRequest,
    PaymentGateway,
};
pub use xendit::XenditClient;
