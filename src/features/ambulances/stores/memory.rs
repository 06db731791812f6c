use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::AmbulanceStore;
use crate::core::error::{AppError, Result};
use crate::features::ambulances::models::Ambulance;
use crate::shared::geo::Coordinate;

/// In-memory ambulance store.
///
/// Conditional writes run under the record's shard guard, so the check and the
/// write cannot interleave with another writer on the same ambulance.
#[derive(Default)]
pub struct InMemoryAmbulanceStore {
    records: DashMap<Uuid, Ambulance>,
    by_driver: DashMap<String, Uuid>,
    by_vehicle: DashMap<String, Uuid>,
}

impl InMemoryAmbulanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `apply` only if `condition` holds; bumps version when `apply` reports a change
    fn write_if(
        &self,
        id: Uuid,
        condition: impl FnOnce(&Ambulance) -> bool,
        apply: impl FnOnce(&mut Ambulance) -> bool,
    ) -> Option<Ambulance> {
        let mut record = self.records.get_mut(&id)?;
        if !condition(&*record) {
            return None;
        }
        if apply(&mut *record) {
            record.version += 1;
            record.updated_at = Utc::now();
        }
        Some(record.clone())
    }

    fn collect(&self, filter: impl Fn(&Ambulance) -> bool) -> Vec<Ambulance> {
        let mut items: Vec<Ambulance> = self
            .records
            .iter()
            .filter(|r| filter(r.value()))
            .map(|r| r.value().clone())
            .collect();
        items.sort_by_key(|a| a.created_at);
        items
    }
}

#[async_trait]
impl AmbulanceStore for InMemoryAmbulanceStore {
    async fn insert(&self, ambulance: &Ambulance) -> Result<()> {
        let vehicle_taken = match self.by_vehicle.entry(ambulance.vehicle_number.clone()) {
            Entry::Occupied(_) => true,
            Entry::Vacant(slot) => {
                slot.insert(ambulance.id);
                false
            }
        };
        if vehicle_taken {
            return Err(AppError::Conflict(format!(
                "Vehicle number '{}' is already registered",
                ambulance.vehicle_number
            )));
        }

        let driver_taken = match self.by_driver.entry(ambulance.driver_id.clone()) {
            Entry::Occupied(_) => true,
            Entry::Vacant(slot) => {
                slot.insert(ambulance.id);
                false
            }
        };
        if driver_taken {
            self.by_vehicle.remove(&ambulance.vehicle_number);
            return Err(AppError::Conflict(
                "Driver already has a registered ambulance".to_string(),
            ));
        }

        self.records.insert(ambulance.id, ambulance.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Ambulance>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_driver(&self, driver_id: &str) -> Result<Option<Ambulance>> {
        let id = match self.by_driver.get(driver_id) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.get(id).await
    }

    async fn list_candidates(&self) -> Result<Vec<Ambulance>> {
        Ok(self.collect(Ambulance::is_candidate))
    }

    async fn list_pending_approval(&self) -> Result<Vec<Ambulance>> {
        Ok(self.collect(|a| !a.approved))
    }

    async fn list_claimed(&self) -> Result<Vec<Ambulance>> {
        Ok(self.collect(|a| a.current_booking_id.is_some()))
    }

    async fn claim(&self, id: Uuid, booking_id: Uuid) -> Result<Option<Ambulance>> {
        Ok(self.write_if(id, Ambulance::is_claimable, |a| {
            a.available = false;
            a.current_booking_id = Some(booking_id);
            true
        }))
    }

    async fn release(&self, id: Uuid, booking_id: Uuid) -> Result<Option<Ambulance>> {
        Ok(self.write_if(
            id,
            |a| a.current_booking_id.is_none() || a.current_booking_id == Some(booking_id),
            |a| {
                if a.current_booking_id.is_none() {
                    return false;
                }
                a.available = true;
                a.current_booking_id = None;
                true
            },
        ))
    }

    async fn approve(&self, id: Uuid) -> Result<Option<Ambulance>> {
        Ok(self.write_if(
            id,
            |_| true,
            |a| {
                let changed = !a.approved;
                a.approved = true;
                changed
            },
        ))
    }

    async fn update_position(
        &self,
        id: Uuid,
        driver_id: &str,
        position: Coordinate,
        at: DateTime<Utc>,
    ) -> Result<Option<Ambulance>> {
        Ok(self.write_if(
            id,
            |a| a.is_owned_by(driver_id),
            |a| {
                a.position = Some(position);
                a.last_location_update = Some(at);
                true
            },
        ))
    }

    async fn set_availability(
        &self,
        id: Uuid,
        driver_id: &str,
        available: bool,
    ) -> Result<Option<Ambulance>> {
        Ok(self.write_if(
            id,
            |a| a.is_owned_by(driver_id) && (!available || a.current_booking_id.is_none()),
            |a| {
                let changed = a.available != available;
                a.available = available;
                changed
            },
        ))
    }
}
