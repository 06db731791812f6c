use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::features::notifications::handlers;
use crate::features::notifications::services::NotificationService;

/// Create routes for the notification inbox
pub fn routes(service: Arc<NotificationService>) -> Router {
    Router::new()
        .route("/api/notifications", get(handlers::list_notifications))
        .route(
            "/api/notifications/read-all",
            put(handlers::mark_all_read),
        )
        .route("/api/notifications/{id}/read", put(handlers::mark_read))
        .with_state(service)
}
