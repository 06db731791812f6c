use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::Result;
use crate::features::ambulances::models::Ambulance;
use crate::shared::geo::Coordinate;

/// Driver onboarding request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterAmbulanceDto {
    /// Vehicle registration plate, e.g. "KA-01-AB-1234"
    #[validate(length(min = 3, max = 20))]
    pub vehicle_number: String,
}

/// Driver position push
#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationUpdateDto {
    #[schema(value_type = f64, example = 12.9716)]
    pub latitude: Decimal,
    #[schema(value_type = f64, example = 77.5946)]
    pub longitude: Decimal,
}

impl LocationUpdateDto {
    pub fn coordinate(&self) -> Result<Coordinate> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityUpdateDto {
    pub available: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AmbulanceResponseDto {
    pub id: Uuid,
    pub driver_id: String,
    pub vehicle_number: String,
    pub is_available: bool,
    pub is_approved: bool,
    #[schema(value_type = Option<String>)]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub longitude: Option<Decimal>,
    pub last_location_update: Option<DateTime<Utc>>,
    pub current_booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Ambulance> for AmbulanceResponseDto {
    fn from(a: Ambulance) -> Self {
        Self {
            id: a.id,
            driver_id: a.driver_id,
            vehicle_number: a.vehicle_number,
            is_available: a.available,
            is_approved: a.approved,
            latitude: a.position.map(|p| p.latitude()),
            longitude: a.position.map(|p| p.longitude()),
            last_location_update: a.last_location_update,
            current_booking_id: a.current_booking_id,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}
