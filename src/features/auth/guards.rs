//! Role-based authorization guards for the application.
//!
//! These guards extract the authenticated user and verify the caller's role
//! before a handler runs. Ownership of a specific booking or ambulance is
//! checked later by the services, which see the same `AuthenticatedUser`.
//!
//! Roles are not hierarchical: a super admin cannot act as a citizen or a
//! driver, since bookings and ambulances belong to a single person.

use crate::core::error::AppError;
use crate::features::auth::model::{AuthenticatedUser, Role};
use axum::{extract::FromRequestParts, http::request::Parts};

fn authenticated(parts: &Parts) -> Result<&AuthenticatedUser, AppError> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Auth("User not authenticated".to_string()))
}

/// Any authenticated caller, whatever the role
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authenticated(parts).cloned()
    }
}

/// Guard for checking if user is super admin.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireSuperAdmin(user): RequireSuperAdmin) { ... }
/// ```
pub struct RequireSuperAdmin(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireSuperAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        match user.role {
            Role::SuperAdmin => Ok(RequireSuperAdmin(user.clone())),
            Role::Citizen | Role::Driver | Role::HospitalAdmin | Role::BloodBankAdmin => Err(
                AppError::Forbidden("Super admin access required".to_string()),
            ),
        }
    }
}

/// Guard for checking if user is an ambulance driver.
pub struct RequireDriver(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireDriver
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        match user.role {
            Role::Driver => Ok(RequireDriver(user.clone())),
            Role::Citizen | Role::HospitalAdmin | Role::BloodBankAdmin | Role::SuperAdmin => {
                Err(AppError::Forbidden("Driver access required".to_string()))
            }
        }
    }
}

/// Guard for checking if user is a citizen.
pub struct RequireCitizen(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireCitizen
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        match user.role {
            Role::Citizen => Ok(RequireCitizen(user.clone())),
            Role::Driver | Role::HospitalAdmin | Role::BloodBankAdmin | Role::SuperAdmin => {
                Err(AppError::Forbidden("Citizen access required".to_string()))
            }
        }
    }
}
