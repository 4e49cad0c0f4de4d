use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::user::load_user;
use crate::error::AppError;
use crate::state::AppState;

/// Resolve a bearer token against the identity provider and put the local
/// [`User`](crate::auth::User) in the request extensions.
///
/// Requests without a token pass through; routes that need a user reject
/// them through the `CurrentUser` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    if let Some(token) = token {
        let identity = state.identity().verify_token(&token).await?;
        let user = load_user(&state.db, identity.id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("User is not registered".to_string()))?;
        request.extensions_mut().insert(user);
    }

    Ok(next.run(request).await)
}
