use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::ambulances::models::{Ambulance, Candidate};
use crate::features::ambulances::stores::AmbulanceStore;
use crate::features::notifications::models::{NotificationCategory, NotificationEvent};
use crate::features::notifications::NotificationSink;
use crate::shared::constants::TITLE_AMBULANCE_APPROVED;
use crate::shared::geo::Coordinate;
use crate::shared::validation::normalize_vehicle_number;

/// Single source of truth for ambulance availability, approval and position.
///
/// Nothing outside this service writes ambulance fields; availability changes
/// only through `claim`, `release` and the guarded `set_availability`.
pub struct ResourceRegistry {
    store: Arc<dyn AmbulanceStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl ResourceRegistry {
    pub fn new(store: Arc<dyn AmbulanceStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { store, notifier }
    }

    /// Driver onboarding
    pub async fn register(&self, driver_id: &str, vehicle_number: &str) -> Result<Ambulance> {
        let vehicle_number = normalize_vehicle_number(vehicle_number).ok_or_else(|| {
            AppError::Validation(format!("Invalid vehicle number '{}'", vehicle_number))
        })?;

        let ambulance = Ambulance::new(driver_id, vehicle_number);
        self.store.insert(&ambulance).await?;

        tracing::info!(
            "Ambulance registered: id={}, vehicle={}, driver={}",
            ambulance.id,
            ambulance.vehicle_number,
            driver_id
        );

        Ok(ambulance)
    }

    pub async fn get(&self, id: Uuid) -> Result<Ambulance> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ambulance '{}' not found", id)))
    }

    pub async fn get_by_driver(&self, driver_id: &str) -> Result<Ambulance> {
        self.store
            .find_by_driver(driver_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No ambulance registered for this driver".to_string()))
    }

    /// Candidate set: approved, available and position-known. Order unspecified.
    pub async fn list_candidates(&self) -> Result<Vec<Candidate>> {
        let ambulances = self.store.list_candidates().await?;
        Ok(ambulances.iter().filter_map(Candidate::from_ambulance).collect())
    }

    pub async fn list_available(&self) -> Result<Vec<Ambulance>> {
        self.store.list_candidates().await
    }

    pub async fn list_pending_approvals(&self) -> Result<Vec<Ambulance>> {
        self.store.list_pending_approval().await
    }

    pub async fn list_claimed(&self) -> Result<Vec<Ambulance>> {
        self.store.list_claimed().await
    }

    /// Atomically takes an available ambulance for `booking_id`.
    ///
    /// `Conflict` covers both a lost race and an unknown id; callers re-run
    /// matching instead of retrying the same ambulance.
    pub async fn claim(&self, id: Uuid, booking_id: Uuid) -> Result<Ambulance> {
        match self.store.claim(id, booking_id).await? {
            Some(ambulance) => {
                tracing::debug!("Ambulance {} claimed by booking {}", id, booking_id);
                Ok(ambulance)
            }
            None => Err(AppError::Conflict(format!(
                "Ambulance '{}' is no longer available",
                id
            ))),
        }
    }

    /// Frees the ambulance held by `booking_id`.
    ///
    /// Idempotent once released. `Conflict` when another booking has claimed
    /// it since; that claim is left untouched.
    pub async fn release(&self, id: Uuid, booking_id: Uuid) -> Result<Ambulance> {
        if let Some(ambulance) = self.store.release(id, booking_id).await? {
            tracing::debug!("Ambulance {} released by booking {}", id, booking_id);
            return Ok(ambulance);
        }

        let current = self.get(id).await?;
        Err(AppError::Conflict(format!(
            "Ambulance '{}' is held by booking {:?}, not {}",
            id, current.current_booking_id, booking_id
        )))
    }

    pub async fn update_position(
        &self,
        id: Uuid,
        position: Coordinate,
        driver_id: &str,
    ) -> Result<Ambulance> {
        match self
            .store
            .update_position(id, driver_id, position, Utc::now())
            .await?
        {
            Some(ambulance) => Ok(ambulance),
            None => Err(self.classify_rejection(id, driver_id).await),
        }
    }

    /// Administrator-only; authorization is enforced by the caller.
    ///
    /// The driver is notified the first time the flag flips.
    pub async fn approve(&self, id: Uuid) -> Result<Ambulance> {
        let before = self.get(id).await?;
        let ambulance = self
            .store
            .approve(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ambulance '{}' not found", id)))?;

        if !before.approved {
            tracing::info!("Ambulance approved: id={}", id);
            self.notifier.publish(NotificationEvent {
                user_id: ambulance.driver_id.clone(),
                title: TITLE_AMBULANCE_APPROVED.to_string(),
                message: format!(
                    "Ambulance {} is approved and can now receive dispatches",
                    ambulance.vehicle_number
                ),
                category: NotificationCategory::System,
                booking_id: None,
            });
        }

        Ok(ambulance)
    }

    /// Manual toggle by the owning driver.
    ///
    /// Making the ambulance available while a booking holds it is a `Conflict`;
    /// the booking has to reach a terminal state first.
    pub async fn set_availability(
        &self,
        id: Uuid,
        available: bool,
        driver_id: &str,
    ) -> Result<Ambulance> {
        match self.store.set_availability(id, driver_id, available).await? {
            Some(ambulance) => {
                tracing::info!(
                    "Ambulance {} availability set to {} by driver",
                    id,
                    available
                );
                Ok(ambulance)
            }
            None => Err(self.classify_rejection(id, driver_id).await),
        }
    }

    /// Explains why a driver-scoped conditional write applied nothing
    async fn classify_rejection(&self, id: Uuid, driver_id: &str) -> AppError {
        match self.store.get(id).await {
            Ok(None) => AppError::NotFound(format!("Ambulance '{}' not found", id)),
            Ok(Some(ambulance)) if !ambulance.is_owned_by(driver_id) => AppError::Unauthorized(
                "Ambulance belongs to another driver".to_string(),
            ),
            Ok(Some(ambulance)) => AppError::Conflict(format!(
                "Ambulance is assigned to active booking {}",
                ambulance
                    .current_booking_id
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "-".to_string())
            )),
            Err(e) => e,
        }
    }
}
