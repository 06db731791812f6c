use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::ambulances::{dtos as ambulances_dtos, handlers as ambulances_handlers};
use crate::features::auth;
use crate::features::bookings::{
    dtos as bookings_dtos, handlers as bookings_handlers, models as bookings_models,
};
use crate::features::notifications::{
    dtos as notifications_dtos, handlers as notifications_handlers,
    models as notifications_models,
};
use crate::features::tracking::{
    dtos as tracking_dtos, handlers as tracking_handlers, models as tracking_models,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handler::get_me,
        // Ambulances
        ambulances_handlers::register_ambulance,
        ambulances_handlers::get_my_ambulance,
        ambulances_handlers::list_available_ambulances,
        ambulances_handlers::update_location,
        ambulances_handlers::update_availability,
        // Admin
        ambulances_handlers::list_pending_ambulances,
        ambulances_handlers::approve_ambulance,
        // Bookings
        bookings_handlers::create_booking,
        bookings_handlers::list_my_bookings,
        bookings_handlers::list_assigned_bookings,
        bookings_handlers::get_booking,
        bookings_handlers::cancel_booking,
        bookings_handlers::update_booking_status,
        bookings_handlers::retry_booking,
        // Tracking
        tracking_handlers::push_location,
        tracking_handlers::stream_locations,
        // Notifications
        notifications_handlers::list_notifications,
        notifications_handlers::mark_read,
        notifications_handlers::mark_all_read,
    ),
    components(
        schemas(
            // Shared
            Meta,
            crate::shared::geo::Coordinate,
            // Auth
            auth::dto::MeResponseDto,
            auth::model::AuthenticatedUser,
            auth::model::Role,
            ApiResponse<auth::dto::MeResponseDto>,
            // Ambulances
            ambulances_dtos::RegisterAmbulanceDto,
            ambulances_dtos::LocationUpdateDto,
            ambulances_dtos::AvailabilityUpdateDto,
            ambulances_dtos::AmbulanceResponseDto,
            ApiResponse<ambulances_dtos::AmbulanceResponseDto>,
            ApiResponse<Vec<ambulances_dtos::AmbulanceResponseDto>>,
            // Bookings
            bookings_models::BookingStatus,
            bookings_dtos::CreateBookingDto,
            bookings_dtos::UpdateBookingStatusDto,
            bookings_dtos::BookingResponseDto,
            ApiResponse<bookings_dtos::BookingResponseDto>,
            ApiResponse<Vec<bookings_dtos::BookingResponseDto>>,
            // Tracking
            tracking_dtos::TrackingPushDto,
            tracking_models::TrackingMessage,
            ApiResponse<tracking_models::TrackingMessage>,
            // Notifications
            notifications_models::NotificationCategory,
            notifications_dtos::NotificationResponseDto,
            notifications_dtos::MarkAllReadResponseDto,
            ApiResponse<notifications_dtos::NotificationResponseDto>,
            ApiResponse<Vec<notifications_dtos::NotificationResponseDto>>,
            ApiResponse<notifications_dtos::MarkAllReadResponseDto>,
        )
    ),
    tags(
        (name = "auth", description = "Caller identity"),
        (name = "ambulances", description = "Driver onboarding, position and availability"),
        (name = "admin", description = "Ambulance approval (super admin only)"),
        (name = "bookings", description = "Emergency booking lifecycle"),
        (name = "tracking", description = "Live ambulance location per booking"),
        (name = "notifications", description = "Per-user notification inbox"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "ERMN Dispatch API",
        version = "0.1.0",
        description = "Emergency ambulance dispatch core",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to the OpenAPI document
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_dispatch_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/bookings",
            "/api/bookings/{id}/cancel",
            "/api/ambulances/{id}/location",
            "/api/notifications/read-all",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
