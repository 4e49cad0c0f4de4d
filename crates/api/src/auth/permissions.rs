use infra::db::Db;
use uuid::Uuid;

use crate::auth::user::{BusinessAdminProfile, CustomerProfile, User};
use crate::domains::catalogue::service as catalogue;
use crate::error::AppError;

pub fn as_customer(user: &User) -> Result<&CustomerProfile, AppError> {
    match user {
        User::Customer(profile) => Ok(profile),
        User::BusinessAdmin(_) => Err(AppError::Forbidden(
            "Access denied: customer account required".into(),
        )),
    }
}

pub fn as_business_admin(user: &User) -> Result<&BusinessAdminProfile, AppError> {
    match user {
        User::BusinessAdmin(profile) => Ok(profile),
        User::Customer(_) => Err(AppError::Forbidden(
            "Access denied: business administrator account required".into(),
        )),
    }
}

/// `NotFound` when the place does not exist, `Forbidden` when someone else owns it.
pub async fn require_place_owner(db: &Db, owner_id: Uuid, place_id: Uuid) -> Result<(), AppError> {
    let actual = catalogue::get_owner_of_place(db, place_id).await?;
    if actual != owner_id {
        return Err(AppError::Forbidden(
            "Access denied: you do not own this place".into(),
        ));
    }
    Ok(())
}
