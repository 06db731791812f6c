use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::model::{AuthenticatedUser, Role};

/// DTO for /auth/me response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponseDto {
    pub user_id: String,
    pub role: Role,
}

impl From<AuthenticatedUser> for MeResponseDto {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            user_id: user.user_id,
            role: user.role,
        }
    }
}
