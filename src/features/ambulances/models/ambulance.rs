use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::geo::Coordinate;

/// Registry record for one ambulance.
///
/// `available` is only ever flipped through the registry's conditional writes;
/// `current_booking_id` is set by a successful claim and cleared by release.
#[derive(Debug, Clone, PartialEq)]
pub struct Ambulance {
    pub id: Uuid,
    pub driver_id: String,
    pub vehicle_number: String,
    pub available: bool,
    pub approved: bool,
    pub position: Option<Coordinate>,
    pub last_location_update: Option<DateTime<Utc>>,
    pub current_booking_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ambulance {
    /// New record for driver onboarding: unapproved, available, no position yet
    pub fn new(driver_id: impl Into<String>, vehicle_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            driver_id: driver_id.into(),
            vehicle_number: vehicle_number.into(),
            available: true,
            approved: false,
            position: None,
            last_location_update: None,
            current_booking_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Member of the candidate set: approved, available and position-known
    pub fn is_candidate(&self) -> bool {
        self.approved && self.available && self.position.is_some()
    }

    pub fn is_claimable(&self) -> bool {
        self.approved && self.available
    }

    pub fn is_owned_by(&self, driver_id: &str) -> bool {
        self.driver_id == driver_id
    }
}

/// Projection handed to the matcher
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: Uuid,
    pub position: Coordinate,
}

impl Candidate {
    pub fn from_ambulance(ambulance: &Ambulance) -> Option<Self> {
        ambulance.position.map(|position| Self {
            id: ambulance.id,
            position,
        })
    }
}
