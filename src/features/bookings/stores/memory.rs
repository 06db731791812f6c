use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::BookingStore;
use crate::core::error::{AppError, Result};
use crate::features::bookings::models::{Booking, BookingStatus, BookingTransition};

/// In-memory booking store; transitions run under the record's shard guard
#[derive(Default)]
pub struct InMemoryBookingStore {
    records: DashMap<Uuid, Booking>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect(&self, filter: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        self.records
            .iter()
            .filter(|r| filter(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        if self.records.contains_key(&booking.id) {
            return Err(AppError::Conflict(format!(
                "Booking '{}' already exists",
                booking.id
            )));
        }
        self.records.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn list_by_citizen(
        &self,
        citizen_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Booking>, i64)> {
        let mut items = self.collect(|b| b.is_citizen(citizen_id));
        items.sort_by(|a, b| b.requested_at.cmp(&a.requested_at).then(b.id.cmp(&a.id)));

        let total = items.len() as i64;
        let page = items
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_active_by_ambulance(&self, ambulance_id: Uuid) -> Result<Vec<Booking>> {
        let mut items =
            self.collect(|b| b.ambulance_id == Some(ambulance_id) && !b.status.is_terminal());
        items.sort_by_key(|b| b.requested_at);
        Ok(items)
    }

    async fn list_requested(&self, limit: i64) -> Result<Vec<Booking>> {
        let mut items = self.collect(|b| b.status == BookingStatus::Requested);
        items.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then(a.id.cmp(&b.id)));
        items.truncate(limit.max(0) as usize);
        Ok(items)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: BookingStatus,
        transition: BookingTransition,
    ) -> Result<Option<Booking>> {
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(None);
        };
        if record.status != expected {
            return Ok(None);
        }
        record.apply(transition);
        Ok(Some(record.clone()))
    }
}
