use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Live position relayed to subscribers of one booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrackingMessage {
    pub booking_id: Uuid,
    pub ambulance_id: Uuid,
    #[schema(value_type = String)]
    pub latitude: Decimal,
    #[schema(value_type = String)]
    pub longitude: Decimal,
    pub timestamp: DateTime<Utc>,
    /// km/h, as reported by the driver client
    pub speed: Option<f64>,
    /// Degrees clockwise from north
    pub heading: Option<f64>,
}
