use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use axum::{
    extract::State,
    http::{
        header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
        Method, StatusCode,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::middleware::auth::auth_middleware;
use crate::routes::{bookings, business_admin, callbacks, places, API_PREFIX};
use crate::state::AppState;

/// Build the HTTP router. The caller serves it with connect info so the
/// rate limiter can fall back to the peer address.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    // Booking creation: 1 token every 2 seconds per client, bursts of 5
    let governor_conf = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(2)
        .burst_size(5)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit configuration"))?;

    let booking_routes = Router::new()
        .route("/place/{id}/booking", post(places::create_booking))
        .layer(GovernorLayer::new(Arc::new(governor_conf)));

    let api = Router::new()
        // Catalogue and availability
        .route("/place", get(places::list_places))
        .route("/place/{id}", get(places::get_place))
        .route("/place/{id}/item", get(places::list_items))
        .route("/place/{id}/review", get(places::list_reviews))
        .route("/place/{id}/available-date", get(places::available_dates))
        .route("/place/{id}/available-time", get(places::available_times))
        .route("/place/{id}/availability", get(places::check_window))
        .merge(booking_routes)
        // Customer bookings
        .route("/booking/ongoing", get(bookings::list_ongoing))
        .route("/booking/previous", get(bookings::list_previous))
        .route("/booking/{id}", get(bookings::get_booking))
        .route("/booking/{id}/cancel", post(bookings::cancel_booking))
        .route("/booking/{id}/review", post(bookings::post_review))
        // Business administrators
        .route("/business-admin/balance", get(business_admin::get_balance))
        .route(
            "/business-admin/disbursement",
            get(business_admin::list_disbursements).post(business_admin::request_disbursement),
        )
        .route(
            "/business-admin/booking/{id}/cancel",
            post(business_admin::cancel_booking),
        )
        .route("/business-admin/{place_id}/booking", get(business_admin::list_bookings))
        // Payment provider webhooks
        .route("/xendit/callback/invoice", post(callbacks::invoice_callback))
        .route("/xendit/callback/disbursement", post(callbacks::disbursement_callback));

    let origins: Vec<HeaderValue> = state
        .config()
        .allowed_origins
        .split(',')
        .filter_map(|o| o.trim().parse().ok())
        .collect();

    let router = Router::new()
        // Simple liveness check; also proves DB connectivity.
        .route("/health", get(health))
        .nest(API_PREFIX, api)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE, AUTHORIZATION])
                .allow_credentials(true),
        );

    Ok(router)
}

/// Liveness + quick DB probe.
async fn health(State(state): State<AppState>) -> Result<&'static str, AppError> {
    let _one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&state.db).await?;
    Ok("ok")
}
