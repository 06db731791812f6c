use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::core::error::Result;
use crate::features::tracking::services::TrackingUpdate;
use crate::shared::geo::Coordinate;

/// Driver client position report
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TrackingPushDto {
    #[schema(value_type = f64, example = 12.9716)]
    pub latitude: Decimal,
    #[schema(value_type = f64, example = 77.5946)]
    pub longitude: Decimal,
    #[validate(range(min = 0.0))]
    pub speed: Option<f64>,
    #[validate(range(min = 0.0, max = 360.0))]
    pub heading: Option<f64>,
}

impl TrackingPushDto {
    pub fn to_update(&self) -> Result<TrackingUpdate> {
        Ok(TrackingUpdate {
            position: Coordinate::new(self.latitude, self.longitude)?,
            speed: self.speed,
            heading: self.heading,
        })
    }
}
