use crate::constants::{DISBURSEMENT_FEE, PLATFORM_FEE, VAT_PERCENT};

/// VAT on a booking total, rounded half up to the rupiah.
pub fn vat(total_price: i64) -> i64 {
    (total_price.max(0) * VAT_PERCENT + 50) / 100
}

/// What the owner is credited when a booking is fulfilled. Never negative.
pub fn owner_credit(total_price: i64) -> i64 {
    (total_price - PLATFORM_FEE - DISBURSEMENT_FEE - vat(total_price)).max(0)
}
