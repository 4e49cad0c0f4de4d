use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::user::User;
use crate::error::AppError;

/// The user resolved by the auth middleware. Rejects with 401 when the
/// route was reached without one.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthenticated("You must be logged in".into()))
    }
}
