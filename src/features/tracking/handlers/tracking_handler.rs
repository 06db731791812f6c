use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::JsonBody;
use crate::features::auth::guards::RequireDriver;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::tracking::dtos::TrackingPushDto;
use crate::features::tracking::models::TrackingMessage;
use crate::features::tracking::services::TrackingService;
use crate::shared::types::ApiResponse;

/// Push the ambulance position for an active booking
#[utoipa::path(
    post,
    path = "/api/tracking/{booking_id}",
    params(
        ("booking_id" = Uuid, Path, description = "Booking ID")
    ),
    request_body = TrackingPushDto,
    responses(
        (status = 200, description = "Position relayed", body = ApiResponse<TrackingMessage>),
        (status = 400, description = "Invalid coordinate"),
        (status = 403, description = "Not the assigned driver"),
        (status = 409, description = "Booking already finished")
    ),
    security(("bearer_auth" = [])),
    tag = "tracking"
)]
pub async fn push_location(
    RequireDriver(user): RequireDriver,
    State(service): State<Arc<TrackingService>>,
    Path(booking_id): Path<Uuid>,
    JsonBody(dto): JsonBody<TrackingPushDto>,
) -> Result<Json<ApiResponse<TrackingMessage>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let message = service.push(booking_id, dto.to_update()?, &user).await?;
    Ok(Json(ApiResponse::success(Some(message), None, None)))
}

/// Live position feed for a booking (Server-Sent Events, event `location`)
#[utoipa::path(
    get,
    path = "/api/tracking/{booking_id}/stream",
    params(
        ("booking_id" = Uuid, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "text/event-stream of TrackingMessage JSON"),
        (status = 403, description = "Caller cannot see this booking"),
        (status = 404, description = "Booking not found")
    ),
    security(("bearer_auth" = [])),
    tag = "tracking"
)]
pub async fn stream_locations(
    user: AuthenticatedUser,
    State(service): State<Arc<TrackingService>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let receiver = service.subscribe(booking_id, &user).await?;

    let stream = BroadcastStream::new(receiver).filter_map(move |item| match item {
        Ok(message) => Event::default().event("location").json_data(&message).ok(),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(
                "Tracking subscriber for booking {} lagged, skipped {} updates",
                booking_id,
                skipped
            );
            None
        }
    });

    Ok(Sse::new(stream.map(Ok)).keep_alive(KeepAlive::default()))
}
