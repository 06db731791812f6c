use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::JsonBody;
use crate::features::ambulances::dtos::{
    AmbulanceResponseDto, AvailabilityUpdateDto, LocationUpdateDto, RegisterAmbulanceDto,
};
use crate::features::ambulances::services::ResourceRegistry;
use crate::features::auth::guards::RequireDriver;
use crate::features::auth::model::AuthenticatedUser;
use crate::shared::types::ApiResponse;

/// Register the caller's ambulance
#[utoipa::path(
    post,
    path = "/api/ambulances",
    request_body = RegisterAmbulanceDto,
    responses(
        (status = 201, description = "Ambulance registered, pending approval", body = ApiResponse<AmbulanceResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Driver access required"),
        (status = 409, description = "Driver already registered or vehicle number taken")
    ),
    security(("bearer_auth" = [])),
    tag = "ambulances"
)]
pub async fn register_ambulance(
    RequireDriver(user): RequireDriver,
    State(registry): State<Arc<ResourceRegistry>>,
    JsonBody(dto): JsonBody<RegisterAmbulanceDto>,
) -> Result<(StatusCode, Json<ApiResponse<AmbulanceResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let ambulance = registry.register(&user.user_id, &dto.vehicle_number).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(ambulance.into()),
            Some("Ambulance registered and awaiting approval".to_string()),
            None,
        )),
    ))
}

/// Get the caller's ambulance
#[utoipa::path(
    get,
    path = "/api/ambulances/mine",
    responses(
        (status = 200, description = "Caller's ambulance", body = ApiResponse<AmbulanceResponseDto>),
        (status = 404, description = "No ambulance registered")
    ),
    security(("bearer_auth" = [])),
    tag = "ambulances"
)]
pub async fn get_my_ambulance(
    RequireDriver(user): RequireDriver,
    State(registry): State<Arc<ResourceRegistry>>,
) -> Result<Json<ApiResponse<AmbulanceResponseDto>>> {
    let ambulance = registry.get_by_driver(&user.user_id).await?;
    Ok(Json(ApiResponse::success(Some(ambulance.into()), None, None)))
}

/// List ambulances that can currently be dispatched
#[utoipa::path(
    get,
    path = "/api/ambulances/available",
    responses(
        (status = 200, description = "Approved, available and position-known ambulances", body = ApiResponse<Vec<AmbulanceResponseDto>>)
    ),
    security(("bearer_auth" = [])),
    tag = "ambulances"
)]
pub async fn list_available_ambulances(
    _user: AuthenticatedUser,
    State(registry): State<Arc<ResourceRegistry>>,
) -> Result<Json<ApiResponse<Vec<AmbulanceResponseDto>>>> {
    let ambulances = registry.list_available().await?;
    let dtos: Vec<AmbulanceResponseDto> = ambulances.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(Some(dtos), None, None)))
}

/// Update the ambulance's last-known position
#[utoipa::path(
    put,
    path = "/api/ambulances/{id}/location",
    params(
        ("id" = Uuid, Path, description = "Ambulance ID")
    ),
    request_body = LocationUpdateDto,
    responses(
        (status = 200, description = "Position updated", body = ApiResponse<AmbulanceResponseDto>),
        (status = 400, description = "Invalid coordinate"),
        (status = 403, description = "Ambulance belongs to another driver"),
        (status = 404, description = "Ambulance not found")
    ),
    security(("bearer_auth" = [])),
    tag = "ambulances"
)]
pub async fn update_location(
    RequireDriver(user): RequireDriver,
    State(registry): State<Arc<ResourceRegistry>>,
    Path(id): Path<Uuid>,
    JsonBody(dto): JsonBody<LocationUpdateDto>,
) -> Result<Json<ApiResponse<AmbulanceResponseDto>>> {
    let position = dto.coordinate()?;
    let ambulance = registry
        .update_position(id, position, &user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(Some(ambulance.into()), None, None)))
}

/// Toggle availability (on/off duty)
#[utoipa::path(
    put,
    path = "/api/ambulances/{id}/availability",
    params(
        ("id" = Uuid, Path, description = "Ambulance ID")
    ),
    request_body = AvailabilityUpdateDto,
    responses(
        (status = 200, description = "Availability updated", body = ApiResponse<AmbulanceResponseDto>),
        (status = 403, description = "Ambulance belongs to another driver"),
        (status = 404, description = "Ambulance not found"),
        (status = 409, description = "Ambulance is assigned to an active booking")
    ),
    security(("bearer_auth" = [])),
    tag = "ambulances"
)]
pub async fn update_availability(
    RequireDriver(user): RequireDriver,
    State(registry): State<Arc<ResourceRegistry>>,
    Path(id): Path<Uuid>,
    JsonBody(dto): JsonBody<AvailabilityUpdateDto>,
) -> Result<Json<ApiResponse<AmbulanceResponseDto>>> {
    let ambulance = registry
        .set_availability(id, dto.available, &user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(Some(ambulance.into()), None, None)))
}
