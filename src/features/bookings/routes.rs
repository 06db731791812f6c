use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::features::bookings::handlers;
use crate::features::bookings::services::BookingService;

/// Create routes for the bookings feature
///
/// Note: This feature requires authentication
pub fn routes(service: Arc<BookingService>) -> Router {
    Router::new()
        .route(
            "/api/bookings",
            post(handlers::create_booking).get(handlers::list_my_bookings),
        )
        .route(
            "/api/bookings/assigned",
            get(handlers::list_assigned_bookings),
        )
        .route("/api/bookings/{id}", get(handlers::get_booking))
        .route("/api/bookings/{id}/cancel", put(handlers::cancel_booking))
        .route(
            "/api/bookings/{id}/status",
            put(handlers::update_booking_status),
        )
        .route("/api/bookings/{id}/retry", post(handlers::retry_booking))
        .with_state(service)
}
