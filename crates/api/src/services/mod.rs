pub mod sweeper_service;

pub use sweeper_service::{spawn_booking_sweeper, BookingSweeper};
