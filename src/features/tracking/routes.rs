use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::tracking::handlers;
use crate::features::tracking::services::TrackingService;

/// Create routes for live tracking
pub fn routes(service: Arc<TrackingService>) -> Router {
    Router::new()
        .route("/api/tracking/{booking_id}", post(handlers::push_location))
        .route(
            "/api/tracking/{booking_id}/stream",
            get(handlers::stream_locations),
        )
        .with_state(service)
}
