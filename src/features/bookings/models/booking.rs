use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::shared::geo::Coordinate;

/// Booking status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Requested,
    Assigned,
    EnRoute,
    Arrived,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            BookingStatus::Completed | BookingStatus::Cancelled => true,
            BookingStatus::Requested
            | BookingStatus::Assigned
            | BookingStatus::EnRoute
            | BookingStatus::Arrived => false,
        }
    }

    /// Citizen cancellation window closes once the driver is en route
    pub fn is_cancellable(&self) -> bool {
        matches!(self, BookingStatus::Requested | BookingStatus::Assigned)
    }

    /// The only state a driver status update may move to from here
    pub fn next_driver_state(&self) -> Option<BookingStatus> {
        match self {
            BookingStatus::Assigned => Some(BookingStatus::EnRoute),
            BookingStatus::EnRoute => Some(BookingStatus::Arrived),
            BookingStatus::Arrived => Some(BookingStatus::Completed),
            BookingStatus::Requested | BookingStatus::Completed | BookingStatus::Cancelled => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Requested => write!(f, "REQUESTED"),
            BookingStatus::Assigned => write!(f, "ASSIGNED"),
            BookingStatus::EnRoute => write!(f, "EN_ROUTE"),
            BookingStatus::Arrived => write!(f, "ARRIVED"),
            BookingStatus::Completed => write!(f, "COMPLETED"),
            BookingStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// State change applied by a store as a compare-and-set on the current status
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BookingTransition {
    /// REQUESTED → ASSIGNED
    Assign {
        ambulance_id: Uuid,
        at: DateTime<Utc>,
    },
    /// Driver-side move to EN_ROUTE, ARRIVED or COMPLETED
    Advance {
        to: BookingStatus,
        at: DateTime<Utc>,
    },
    Cancel,
}

impl BookingTransition {
    pub fn target(&self) -> BookingStatus {
        match self {
            BookingTransition::Assign { .. } => BookingStatus::Assigned,
            BookingTransition::Advance { to, .. } => *to,
            BookingTransition::Cancel => BookingStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub citizen_id: String,
    pub ambulance_id: Option<Uuid>,
    pub pickup: Coordinate,
    pub destination: Option<Coordinate>,
    pub status: BookingStatus,
    pub requested_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Fresh REQUESTED booking with no ambulance
    pub fn new(
        citizen_id: impl Into<String>,
        pickup: Coordinate,
        destination: Option<Coordinate>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            citizen_id: citizen_id.into(),
            ambulance_id: None,
            pickup,
            destination,
            status: BookingStatus::Requested,
            requested_at: now,
            assigned_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Applies `transition` in place.
    ///
    /// Timestamps are clamped so `requested_at <= assigned_at <= completed_at`
    /// holds even if the supplied clock reading is earlier.
    pub fn apply(&mut self, transition: BookingTransition) {
        match transition {
            BookingTransition::Assign { ambulance_id, at } => {
                self.ambulance_id = Some(ambulance_id);
                self.assigned_at = Some(at.max(self.requested_at));
            }
            BookingTransition::Advance { to, at } => {
                if to == BookingStatus::Completed {
                    let floor = self.assigned_at.unwrap_or(self.requested_at);
                    self.completed_at = Some(at.max(floor));
                }
            }
            BookingTransition::Cancel => {}
        }
        self.status = transition.target();
        self.updated_at = Utc::now();
    }

    pub fn is_citizen(&self, user_id: &str) -> bool {
        self.citizen_id == user_id
    }
}
