//! Persistence boundary for ambulance records.
//!
//! Every mutating method is a single conditional write: it either applies in
//! full and returns the updated record, or applies nothing and returns `None`.
//! Callers classify a `None` themselves with a follow-up read.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::ambulances::models::Ambulance;
use crate::shared::geo::Coordinate;

pub use memory::InMemoryAmbulanceStore;
pub use postgres::PgAmbulanceStore;

#[async_trait]
pub trait AmbulanceStore: Send + Sync {
    /// Fails with `Conflict` when the driver already owns an ambulance or the
    /// vehicle number is taken
    async fn insert(&self, ambulance: &Ambulance) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Ambulance>>;

    async fn find_by_driver(&self, driver_id: &str) -> Result<Option<Ambulance>>;

    /// Approved, available and position-known records
    async fn list_candidates(&self) -> Result<Vec<Ambulance>>;

    async fn list_pending_approval(&self) -> Result<Vec<Ambulance>>;

    /// Records currently holding a booking back-reference
    async fn list_claimed(&self) -> Result<Vec<Ambulance>>;

    /// Available + approved → unavailable, recording `booking_id`
    async fn claim(&self, id: Uuid, booking_id: Uuid) -> Result<Option<Ambulance>>;

    /// Back to available and unclaimed, but only while `booking_id` holds the
    /// claim. An unclaimed record is returned unchanged; `None` when the record
    /// is absent or another booking holds it.
    async fn release(&self, id: Uuid, booking_id: Uuid) -> Result<Option<Ambulance>>;

    /// One-way approval flag; `None` only when the record is absent
    async fn approve(&self, id: Uuid) -> Result<Option<Ambulance>>;

    /// Applies only when `driver_id` owns the record
    async fn update_position(
        &self,
        id: Uuid,
        driver_id: &str,
        position: Coordinate,
        at: DateTime<Utc>,
    ) -> Result<Option<Ambulance>>;

    /// Applies only when `driver_id` owns the record and, for `available = true`,
    /// no booking currently holds it
    async fn set_availability(
        &self,
        id: Uuid,
        driver_id: &str,
        available: bool,
    ) -> Result<Option<Ambulance>>;
}
