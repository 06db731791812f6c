use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::ambulances::dtos::AmbulanceResponseDto;
use crate::features::ambulances::services::ResourceRegistry;
use crate::features::auth::guards::RequireSuperAdmin;
use crate::shared::types::{ApiResponse, Meta};

/// List ambulances awaiting approval
#[utoipa::path(
    get,
    path = "/api/admin/ambulances/pending",
    responses(
        (status = 200, description = "Unapproved ambulances, oldest first", body = ApiResponse<Vec<AmbulanceResponseDto>>),
        (status = 403, description = "Super admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_pending_ambulances(
    RequireSuperAdmin(_admin): RequireSuperAdmin,
    State(registry): State<Arc<ResourceRegistry>>,
) -> Result<Json<ApiResponse<Vec<AmbulanceResponseDto>>>> {
    let ambulances = registry.list_pending_approvals().await?;
    let total = ambulances.len() as i64;
    let dtos: Vec<AmbulanceResponseDto> = ambulances.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta { total }),
    )))
}

/// Approve an ambulance for dispatch
#[utoipa::path(
    put,
    path = "/api/admin/ambulances/{id}/approve",
    params(
        ("id" = Uuid, Path, description = "Ambulance ID")
    ),
    responses(
        (status = 200, description = "Ambulance approved", body = ApiResponse<AmbulanceResponseDto>),
        (status = 403, description = "Super admin access required"),
        (status = 404, description = "Ambulance not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn approve_ambulance(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(registry): State<Arc<ResourceRegistry>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AmbulanceResponseDto>>> {
    let ambulance = registry.approve(id).await?;
    tracing::info!("Ambulance {} approved by {}", id, admin.user_id);
    Ok(Json(ApiResponse::success(
        Some(ambulance.into()),
        Some("Ambulance approved".to_string()),
        None,
    )))
}
