//! Business constants baked into the binary.

use chrono::Duration;

/// Every place's slot interval is a multiple of this.
pub const BASE_SLOT_INTERVAL_MINUTES: u32 = 30;

/// How long an unpaid booking holds capacity. Also sent to the payment
/// gateway as the invoice duration so both expire together.
pub const BOOKING_HOLD_SECONDS: i64 = 7_200;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

pub const DEFAULT_PAYMENT_METHODS: &[&str] = &[
    "BCA", "BNI", "BRI", "MANDIRI", "PERMATA", "QRIS", "OVO", "DANA", "SHOPEEPAY",
];

/// Charged to the customer on every booking, kept by the platform.
pub const PLATFORM_FEE: i64 = 3_000;
/// Per-booking service charge added to the customer's total.
pub const BOOKING_FEE: i64 = 0;
/// Withheld from the owner's credit to cover the payout transfer.
pub const DISBURSEMENT_FEE: i64 = 5_000;
/// VAT percentage withheld from the owner's credit, computed on the booking total.
pub const VAT_PERCENT: i64 = 11;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;
pub const MAX_REVIEW_LENGTH: usize = 500;

/// Longest span of dates scanned by one availability query.
pub const MAX_AVAILABLE_DATE_SPAN_DAYS: u64 = 366;

/// Upper bound on bookings fulfilled per sweeper tick.
pub const FULFILMENT_BATCH_SIZE: i64 = 200;

pub fn booking_hold() -> Duration {
    Duration::seconds(BOOKING_HOLD_SECONDS)
}
