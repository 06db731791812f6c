use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::features::ambulances::handlers;
use crate::features::ambulances::services::ResourceRegistry;

/// Driver-facing ambulance routes
pub fn routes(registry: Arc<ResourceRegistry>) -> Router {
    Router::new()
        .route("/api/ambulances", post(handlers::register_ambulance))
        .route("/api/ambulances/mine", get(handlers::get_my_ambulance))
        .route(
            "/api/ambulances/available",
            get(handlers::list_available_ambulances),
        )
        .route(
            "/api/ambulances/{id}/location",
            put(handlers::update_location),
        )
        .route(
            "/api/ambulances/{id}/availability",
            put(handlers::update_availability),
        )
        .with_state(registry)
}

/// Super admin approval routes
pub fn admin_routes(registry: Arc<ResourceRegistry>) -> Router {
    Router::new()
        .route(
            "/api/admin/ambulances/pending",
            get(handlers::list_pending_ambulances),
        )
        .route(
            "/api/admin/ambulances/{id}/approve",
            put(handlers::approve_ambulance),
        )
        .with_state(registry)
}
