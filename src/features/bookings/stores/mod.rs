//! Persistence boundary for bookings.
//!
//! Status changes go through `transition`, a compare-and-set on the current
//! status: it applies in full or not at all.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::bookings::models::{Booking, BookingStatus, BookingTransition};

pub use memory::InMemoryBookingStore;
pub use postgres::PgBookingStore;

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: &Booking) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Booking>>;

    /// Newest first, with the total count for the citizen
    async fn list_by_citizen(
        &self,
        citizen_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Booking>, i64)>;

    /// Non-terminal bookings assigned to the ambulance
    async fn list_active_by_ambulance(&self, ambulance_id: Uuid) -> Result<Vec<Booking>>;

    /// Oldest REQUESTED bookings first
    async fn list_requested(&self, limit: i64) -> Result<Vec<Booking>>;

    /// Applies `transition` only while the booking is still in `expected`.
    /// `None` when the booking is absent or its status moved on.
    async fn transition(
        &self,
        id: Uuid,
        expected: BookingStatus,
        transition: BookingTransition,
    ) -> Result<Option<Booking>>;
}
