use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::JsonBody;
use crate::features::auth::guards::{RequireCitizen, RequireDriver};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::bookings::dtos::{
    BookingResponseDto, CreateBookingDto, UpdateBookingStatusDto,
};
use crate::features::bookings::services::BookingService;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Request an ambulance
#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingDto,
    responses(
        (status = 201, description = "Booking created; ASSIGNED when an ambulance was dispatched, otherwise REQUESTED", body = ApiResponse<BookingResponseDto>),
        (status = 400, description = "Invalid pickup or destination"),
        (status = 403, description = "Citizen access required")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn create_booking(
    RequireCitizen(user): RequireCitizen,
    State(service): State<Arc<BookingService>>,
    JsonBody(dto): JsonBody<CreateBookingDto>,
) -> Result<(StatusCode, Json<ApiResponse<BookingResponseDto>>)> {
    let pickup = dto.pickup()?;
    let destination = dto.destination()?;

    let booking = service.create(&user, pickup, destination).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(booking.into()), None, None)),
    ))
}

/// List the caller's bookings
#[utoipa::path(
    get,
    path = "/api/bookings",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Caller's bookings, newest first", body = ApiResponse<Vec<BookingResponseDto>>),
        (status = 403, description = "Citizen access required")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn list_my_bookings(
    RequireCitizen(user): RequireCitizen,
    State(service): State<Arc<BookingService>>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<BookingResponseDto>>>> {
    let (bookings, total) = service.list_for_citizen(&user, &pagination).await?;
    let dtos: Vec<BookingResponseDto> = bookings.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta { total }),
    )))
}

/// List active bookings assigned to the caller's ambulance
#[utoipa::path(
    get,
    path = "/api/bookings/assigned",
    responses(
        (status = 200, description = "Active bookings for the driver's ambulance", body = ApiResponse<Vec<BookingResponseDto>>),
        (status = 403, description = "Driver access required")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn list_assigned_bookings(
    RequireDriver(user): RequireDriver,
    State(service): State<Arc<BookingService>>,
) -> Result<Json<ApiResponse<Vec<BookingResponseDto>>>> {
    let bookings = service.list_for_driver(&user).await?;
    let dtos: Vec<BookingResponseDto> = bookings.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(Some(dtos), None, None)))
}

/// Get booking by ID
#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking found", body = ApiResponse<BookingResponseDto>),
        (status = 403, description = "Caller cannot see this booking"),
        (status = 404, description = "Booking not found")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn get_booking(
    user: AuthenticatedUser,
    State(service): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingResponseDto>>> {
    let booking = service.get(id, &user).await?;
    Ok(Json(ApiResponse::success(Some(booking.into()), None, None)))
}

/// Cancel a booking
#[utoipa::path(
    put,
    path = "/api/bookings/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking cancelled", body = ApiResponse<BookingResponseDto>),
        (status = 403, description = "Not the booking's citizen"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking can no longer be cancelled")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn cancel_booking(
    RequireCitizen(user): RequireCitizen,
    State(service): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingResponseDto>>> {
    let booking = service.cancel(id, &user).await?;
    Ok(Json(ApiResponse::success(
        Some(booking.into()),
        Some("Booking cancelled".to_string()),
        None,
    )))
}

/// Advance a booking (driver)
#[utoipa::path(
    put,
    path = "/api/bookings/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    request_body = UpdateBookingStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<BookingResponseDto>),
        (status = 403, description = "Not the assigned driver"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Not the next state, or booking changed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn update_booking_status(
    RequireDriver(user): RequireDriver,
    State(service): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
    JsonBody(dto): JsonBody<UpdateBookingStatusDto>,
) -> Result<Json<ApiResponse<BookingResponseDto>>> {
    let booking = service.update_status(id, dto.status, &user).await?;
    Ok(Json(ApiResponse::success(Some(booking.into()), None, None)))
}

/// Re-run matching for a booking still waiting for an ambulance
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/retry",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking after the retry; still REQUESTED when nothing is available", body = ApiResponse<BookingResponseDto>),
        (status = 403, description = "Not the booking's citizen"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking is not REQUESTED")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn retry_booking(
    user: AuthenticatedUser,
    State(service): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingResponseDto>>> {
    let booking = service.retry_assignment(id, &user).await?;
    Ok(Json(ApiResponse::success(Some(booking.into()), None, None)))
}
