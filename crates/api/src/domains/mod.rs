pub mod availability;
pub mod booking;
pub mod catalogue;
pub mod clock;
pub mod lifecycle;
pub mod payout;
