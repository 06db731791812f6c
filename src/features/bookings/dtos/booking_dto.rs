use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::bookings::models::{Booking, BookingStatus};
use crate::shared::geo::Coordinate;

/// Request DTO for an ambulance booking
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookingDto {
    #[schema(value_type = Option<f64>, example = 12.9716)]
    pub pickup_latitude: Option<Decimal>,
    #[schema(value_type = Option<f64>, example = 77.5946)]
    pub pickup_longitude: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub destination_latitude: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub destination_longitude: Option<Decimal>,
}

impl CreateBookingDto {
    pub fn pickup(&self) -> Result<Coordinate> {
        let latitude = self
            .pickup_latitude
            .ok_or_else(|| AppError::Validation("Pickup latitude is required".to_string()))?;
        let longitude = self
            .pickup_longitude
            .ok_or_else(|| AppError::Validation("Pickup longitude is required".to_string()))?;
        Coordinate::new(latitude, longitude)
    }

    pub fn destination(&self) -> Result<Option<Coordinate>> {
        Coordinate::from_parts(self.destination_latitude, self.destination_longitude)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBookingStatusDto {
    pub status: BookingStatus,
}

/// Response DTO for booking
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingResponseDto {
    pub id: Uuid,
    pub citizen_id: String,
    pub ambulance_id: Option<Uuid>,
    #[schema(value_type = String)]
    pub pickup_latitude: Decimal,
    #[schema(value_type = String)]
    pub pickup_longitude: Decimal,
    #[schema(value_type = Option<String>)]
    pub destination_latitude: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub destination_longitude: Option<Decimal>,
    pub status: BookingStatus,
    pub requested_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponseDto {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            citizen_id: b.citizen_id,
            ambulance_id: b.ambulance_id,
            pickup_latitude: b.pickup.latitude(),
            pickup_longitude: b.pickup.longitude(),
            destination_latitude: b.destination.map(|d| d.latitude()),
            destination_longitude: b.destination.map(|d| d.longitude()),
            status: b.status,
            requested_at: b.requested_at,
            assigned_at: b.assigned_at,
            completed_at: b.completed_at,
            updated_at: b.updated_at,
        }
    }
}
