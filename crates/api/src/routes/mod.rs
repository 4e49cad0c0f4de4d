pub mod bookings;
pub mod business_admin;
pub mod callbacks;
pub mod places;

use serde::Serialize;

use crate::error::AppError;
use crate::response::{ok, ApiResponse, PageRequest, Paged, Pagination};
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1";

/// Wrap a page of rows with links back to `path` (relative to the API prefix).
pub(crate) fn paged<T: Serialize>(
    state: &AppState,
    message: &str,
    path: &str,
    request: PageRequest,
    items: Vec<T>,
    total_count: i64,
) -> Result<ApiResponse<Paged<T>>, AppError> {
    let pagination = Pagination::build(
        &state.config().base_url,
        &format!("{API_PREFIX}{path}"),
        request,
        total_count,
    )?;
    Ok(ok(message, Paged { items, pagination }))
}
