pub mod booking_events;
pub mod bookings;
pub mod business_owners;
pub mod disbursements;
pub mod items;
pub mod places;
pub mod reviews;
pub mod users;

pub use bookings::{BookingStatus, CreateBooking, CreateBookingItem};
pub use business_owners::CreateBusinessOwner;
pub use disbursements::DisbursementStatus;
pub use items::CreateItemData;
pub use places::CreatePlaceData;
pub use reviews::CreateReview;
pub use users::{CreateUserData, UserRole};
