pub mod extractor;
pub mod identity;
pub mod permissions;
pub mod user;

pub use extractor::CurrentUser;
pub use identity::{HttpIdentityProvider, IdentityError, IdentityProvider, IdentityUser};
pub use user::{BusinessAdminProfile, CustomerProfile, User};
