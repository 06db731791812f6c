use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::ambulances::models::Ambulance;
use crate::features::ambulances::{DispatchMatcher, ResourceRegistry};
use crate::features::auth::model::{AuthenticatedUser, Role};
use crate::features::bookings::models::{Booking, BookingStatus, BookingTransition};
use crate::features::bookings::stores::BookingStore;
use crate::features::notifications::models::NotificationEvent;
use crate::features::notifications::NotificationSink;
use crate::features::tracking::TrackingHub;
use crate::shared::constants::{
    TITLE_AMBULANCE_ASSIGNED, TITLE_BOOKING_CANCELLED, TITLE_BOOKING_STATUS_UPDATED,
    TITLE_NEW_ASSIGNMENT,
};
use crate::shared::geo::Coordinate;
use crate::shared::types::PaginationQuery;

/// Extra matching rounds after a lost claim race
const CLAIM_RETRIES: usize = 1;

/// Booking state machine: REQUESTED → ASSIGNED → EN_ROUTE → ARRIVED → COMPLETED,
/// with CANCELLED reachable from REQUESTED or ASSIGNED.
///
/// Every status change is a compare-and-set on the booking's current status;
/// ambulance availability changes only through the registry's claim/release.
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    registry: Arc<ResourceRegistry>,
    matcher: Arc<DispatchMatcher>,
    notifier: Arc<dyn NotificationSink>,
    tracking: Option<Arc<TrackingHub>>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        registry: Arc<ResourceRegistry>,
        matcher: Arc<DispatchMatcher>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            registry,
            matcher,
            notifier,
            tracking: None,
        }
    }

    /// Live tracking feeds to end when a booking reaches a terminal state
    pub fn with_tracking(mut self, hub: Arc<TrackingHub>) -> Self {
        self.tracking = Some(hub);
        self
    }

    /// Creates a booking and tries to dispatch the nearest ambulance.
    ///
    /// No candidate, or losing the claim race twice, leaves the booking
    /// REQUESTED; that is not an error.
    pub async fn create(
        &self,
        caller: &AuthenticatedUser,
        pickup: Coordinate,
        destination: Option<Coordinate>,
    ) -> Result<Booking> {
        match caller.role {
            Role::Citizen => {}
            Role::Driver | Role::HospitalAdmin | Role::BloodBankAdmin | Role::SuperAdmin => {
                return Err(AppError::Unauthorized(
                    "Only citizens can request an ambulance".to_string(),
                ))
            }
        }

        let mut booking = Booking::new(&caller.user_id, pickup, destination);
        let claimed = self.claim_nearest(booking.id, pickup).await?;

        if let Some(ambulance) = &claimed {
            booking.apply(BookingTransition::Assign {
                ambulance_id: ambulance.id,
                at: Utc::now(),
            });
        }

        if let Err(e) = self.store.insert(&booking).await {
            if let Some(ambulance) = &claimed {
                self.release_quietly(ambulance.id, booking.id).await;
            }
            return Err(e);
        }

        tracing::info!(
            "Booking created: id={}, citizen={}, status={}, ambulance={:?}",
            booking.id,
            booking.citizen_id,
            booking.status,
            booking.ambulance_id
        );

        if let Some(ambulance) = &claimed {
            self.notify_assignment(&booking, ambulance);
        }

        Ok(booking)
    }

    /// Visible to the booking's citizen, the assigned driver or a super admin
    pub async fn get(&self, id: Uuid, caller: &AuthenticatedUser) -> Result<Booking> {
        let booking = self.load(id).await?;

        let allowed = match caller.role {
            Role::SuperAdmin => true,
            Role::Citizen => booking.is_citizen(&caller.user_id),
            Role::Driver => self.is_assigned_driver(&booking, caller).await?,
            Role::HospitalAdmin | Role::BloodBankAdmin => false,
        };
        if !allowed {
            return Err(AppError::Unauthorized(
                "Unauthorized access to booking".to_string(),
            ));
        }

        Ok(booking)
    }

    /// Loads a booking on behalf of the driver of its assigned ambulance
    pub async fn get_for_assigned_driver(
        &self,
        id: Uuid,
        caller: &AuthenticatedUser,
    ) -> Result<Booking> {
        let booking = self.load(id).await?;
        if !self.is_assigned_driver(&booking, caller).await? {
            return Err(AppError::Unauthorized(
                "Caller is not the driver assigned to this booking".to_string(),
            ));
        }
        Ok(booking)
    }

    pub async fn list_for_citizen(
        &self,
        caller: &AuthenticatedUser,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<Booking>, i64)> {
        self.store
            .list_by_citizen(&caller.user_id, pagination.offset(), pagination.limit())
            .await
    }

    /// Non-terminal bookings assigned to the caller's ambulance
    pub async fn list_for_driver(&self, caller: &AuthenticatedUser) -> Result<Vec<Booking>> {
        let ambulance = match self.registry.get_by_driver(&caller.user_id).await {
            Ok(ambulance) => ambulance,
            Err(AppError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        self.store.list_active_by_ambulance(ambulance.id).await
    }

    /// Citizen cancellation; allowed only from REQUESTED or ASSIGNED.
    ///
    /// A second cancel fails with `InvalidTransition`.
    pub async fn cancel(&self, id: Uuid, caller: &AuthenticatedUser) -> Result<Booking> {
        let mut booking = self.load(id).await?;
        if !caller.is_citizen(&booking.citizen_id) {
            return Err(AppError::Unauthorized(
                "Unauthorized to cancel this booking".to_string(),
            ));
        }

        // Status only moves forward, so this settles within a couple of rounds
        let cancelled = loop {
            if !booking.status.is_cancellable() {
                return Err(AppError::InvalidTransition(format!(
                    "Cannot cancel a booking in status {}",
                    booking.status
                )));
            }
            match self
                .store
                .transition(id, booking.status, BookingTransition::Cancel)
                .await?
            {
                Some(cancelled) => break cancelled,
                None => booking = self.load(id).await?,
            }
        };

        tracing::info!("Booking {} cancelled by citizen", id);
        self.end_tracking(id);

        if let Some(ambulance_id) = cancelled.ambulance_id {
            if let Some(ambulance) = self.release_quietly(ambulance_id, id).await {
                self.notifier.publish(NotificationEvent::booking_update(
                    &ambulance.driver_id,
                    id,
                    TITLE_BOOKING_CANCELLED,
                    "The citizen cancelled the booking assigned to you",
                ));
            }
        }

        Ok(cancelled)
    }

    /// Driver-side progress; `status` must be exactly the next state
    pub async fn update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        caller: &AuthenticatedUser,
    ) -> Result<Booking> {
        let booking = self.get_for_assigned_driver(id, caller).await?;
        let ambulance_id = booking.ambulance_id.ok_or_else(|| {
            AppError::Unauthorized("Unauthorized to update this booking".to_string())
        })?;

        if booking.status.next_driver_state() != Some(status) {
            return Err(AppError::InvalidTransition(format!(
                "Cannot move booking from {} to {}",
                booking.status, status
            )));
        }

        let updated = self
            .store
            .transition(
                id,
                booking.status,
                BookingTransition::Advance {
                    to: status,
                    at: Utc::now(),
                },
            )
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Booking {} was modified concurrently", id))
            })?;

        tracing::info!("Booking {} moved to {}", id, status);

        if status == BookingStatus::Completed {
            self.end_tracking(id);
            self.release_quietly(ambulance_id, id).await;
        }

        self.notifier.publish(NotificationEvent::booking_update(
            &updated.citizen_id,
            id,
            TITLE_BOOKING_STATUS_UPDATED,
            format!("Your booking status has been updated to {}", status),
        ));

        Ok(updated)
    }

    /// Re-runs matching for a REQUESTED booking. Returns it unchanged when
    /// nothing is available.
    pub async fn retry_assignment(&self, id: Uuid, caller: &AuthenticatedUser) -> Result<Booking> {
        let booking = self.load(id).await?;
        if !(caller.is_citizen(&booking.citizen_id) || caller.is_super_admin()) {
            return Err(AppError::Unauthorized(
                "Unauthorized to retry this booking".to_string(),
            ));
        }
        if booking.status != BookingStatus::Requested {
            return Err(AppError::InvalidTransition(format!(
                "Only REQUESTED bookings can be re-matched, booking is {}",
                booking.status
            )));
        }

        self.assign_requested(booking).await
    }

    /// System-actor pass over the oldest REQUESTED bookings; returns how many
    /// got an ambulance
    pub async fn assign_requested_batch(&self, limit: i64) -> Result<usize> {
        let pending = self.store.list_requested(limit).await?;
        let mut assigned = 0;

        for booking in pending {
            let id = booking.id;
            match self.assign_requested(booking).await {
                Ok(b) if b.status == BookingStatus::Assigned => assigned += 1,
                Ok(_) => {}
                Err(e) => tracing::error!("Failed to re-match booking {}: {:?}", id, e),
            }
        }

        Ok(assigned)
    }

    /// Releases claims whose booking is missing, terminal or points at a
    /// different ambulance. Returns the number released.
    ///
    /// Claims touched within `grace` are skipped; their booking write may still
    /// be in flight.
    pub async fn reconcile_claims(&self, grace: Duration) -> Result<usize> {
        let cutoff = Utc::now() - grace;
        let mut released = 0;

        for ambulance in self.registry.list_claimed().await? {
            let Some(booking_id) = ambulance.current_booking_id else {
                continue;
            };
            if ambulance.updated_at > cutoff {
                continue;
            }

            let stale = match self.store.get(booking_id).await? {
                None => true,
                Some(b) => b.status.is_terminal() || b.ambulance_id != Some(ambulance.id),
            };
            if stale {
                tracing::warn!(
                    "Releasing stale claim: ambulance={}, booking={}",
                    ambulance.id,
                    booking_id
                );
                match self.registry.release(ambulance.id, booking_id).await {
                    Ok(_) => released += 1,
                    // Re-claimed by a newer booking since the snapshot
                    Err(AppError::Conflict(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(released)
    }

    async fn load(&self, id: Uuid) -> Result<Booking> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking '{}' not found", id)))
    }

    async fn is_assigned_driver(&self, booking: &Booking, caller: &AuthenticatedUser) -> Result<bool> {
        let Some(ambulance_id) = booking.ambulance_id else {
            return Ok(false);
        };
        let ambulance = self.registry.get(ambulance_id).await?;
        Ok(caller.is_driver(&ambulance.driver_id))
    }

    /// Matches and claims, re-running the match after a lost race
    async fn claim_nearest(&self, booking_id: Uuid, pickup: Coordinate) -> Result<Option<Ambulance>> {
        for attempt in 0..=CLAIM_RETRIES {
            let Some(found) = self.matcher.find_nearest(pickup).await? else {
                return Ok(None);
            };

            match self.registry.claim(found.ambulance_id, booking_id).await {
                Ok(ambulance) => return Ok(Some(ambulance)),
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(
                        "Lost claim race for ambulance {} (booking {}, attempt {})",
                        found.ambulance_id,
                        booking_id,
                        attempt + 1
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    async fn assign_requested(&self, booking: Booking) -> Result<Booking> {
        let Some(ambulance) = self.claim_nearest(booking.id, booking.pickup).await? else {
            return Ok(booking);
        };

        let transition = BookingTransition::Assign {
            ambulance_id: ambulance.id,
            at: Utc::now(),
        };
        let result = self
            .store
            .transition(booking.id, BookingStatus::Requested, transition)
            .await;

        match result {
            Ok(Some(assigned)) => {
                tracing::info!(
                    "Booking {} assigned to ambulance {}",
                    assigned.id,
                    ambulance.id
                );
                self.notify_assignment(&assigned, &ambulance);
                Ok(assigned)
            }
            Ok(None) => {
                // Cancelled or assigned elsewhere in the meantime
                self.release_quietly(ambulance.id, booking.id).await;
                self.load(booking.id).await
            }
            Err(e) => {
                self.release_quietly(ambulance.id, booking.id).await;
                Err(e)
            }
        }
    }

    /// Release that cannot fail the caller; leftovers are picked up by
    /// `reconcile_claims`
    async fn release_quietly(&self, ambulance_id: Uuid, booking_id: Uuid) -> Option<Ambulance> {
        match self.registry.release(ambulance_id, booking_id).await {
            Ok(ambulance) => Some(ambulance),
            Err(AppError::Conflict(_)) => {
                tracing::warn!(
                    "Ambulance {} already moved on from booking {}",
                    ambulance_id,
                    booking_id
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    "Failed to release ambulance {} for booking {}: {:?}",
                    ambulance_id,
                    booking_id,
                    e
                );
                None
            }
        }
    }

    fn end_tracking(&self, booking_id: Uuid) {
        if let Some(hub) = &self.tracking {
            hub.close(booking_id);
        }
    }

    fn notify_assignment(&self, booking: &Booking, ambulance: &Ambulance) {
        self.notifier.publish(NotificationEvent::booking_update(
            &booking.citizen_id,
            booking.id,
            TITLE_AMBULANCE_ASSIGNED,
            format!(
                "Ambulance {} has been assigned to your request",
                ambulance.vehicle_number
            ),
        ));
        self.notifier.publish(NotificationEvent::booking_update(
            &ambulance.driver_id,
            booking.id,
            TITLE_NEW_ASSIGNMENT,
            "A new booking has been assigned to your ambulance",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ambulances::stores::{AmbulanceStore, InMemoryAmbulanceStore};
    use crate::features::bookings::stores::InMemoryBookingStore;
    use crate::shared::test_helpers::{coord, RecordingNotificationSink};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Fixture {
        service: Arc<BookingService>,
        registry: Arc<ResourceRegistry>,
        sink: Arc<RecordingNotificationSink>,
    }

    fn fixture_with(store: Arc<dyn BookingStore>, ambulances: Arc<dyn AmbulanceStore>) -> Fixture {
        let sink = Arc::new(RecordingNotificationSink::new());
        let registry = Arc::new(ResourceRegistry::new(ambulances, sink.clone()));
        let matcher = Arc::new(DispatchMatcher::new(registry.clone()));
        let service = Arc::new(BookingService::new(
            store,
            registry.clone(),
            matcher,
            sink.clone(),
        ));
        Fixture {
            service,
            registry,
            sink,
        }
    }

    fn fixture_with_store(store: Arc<dyn BookingStore>) -> Fixture {
        fixture_with(store, Arc::new(InMemoryAmbulanceStore::new()))
    }

    fn fixture() -> Fixture {
        fixture_with_store(Arc::new(InMemoryBookingStore::new()))
    }

    fn citizen(id: &str) -> AuthenticatedUser {
        AuthenticatedUser::new(id, Role::Citizen)
    }

    fn driver(id: &str) -> AuthenticatedUser {
        AuthenticatedUser::new(id, Role::Driver)
    }

    async fn ready_ambulance(f: &Fixture, driver_id: &str, vehicle: &str, lat: &str, lon: &str) -> Ambulance {
        let ambulance = f.registry.register(driver_id, vehicle).await.unwrap();
        f.registry.approve(ambulance.id).await.unwrap();
        f.registry
            .update_position(ambulance.id, coord(lat, lon), driver_id)
            .await
            .unwrap()
    }

    fn pickup() -> Coordinate {
        coord("12.9716", "77.5946")
    }

    #[tokio::test]
    async fn test_create_assigns_nearest_ambulance() {
        let f = fixture();
        let near = ready_ambulance(&f, "d-near", "AMB001", "12.9716", "77.5946").await;
        ready_ambulance(&f, "d-far", "AMB002", "13.05", "77.60").await;

        let booking = f
            .service
            .create(&citizen("c-1"), pickup(), Some(coord("12.95", "77.60")))
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Assigned);
        assert_eq!(booking.ambulance_id, Some(near.id));
        assert!(booking.assigned_at.unwrap() >= booking.requested_at);

        let ambulance = f.registry.get(near.id).await.unwrap();
        assert!(!ambulance.available);
        assert_eq!(ambulance.current_booking_id, Some(booking.id));

        let events = f.sink.events_for("c-1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, TITLE_AMBULANCE_ASSIGNED);
        assert_eq!(f.sink.events_for("d-near").last().unwrap().title, TITLE_NEW_ASSIGNMENT);
    }

    #[tokio::test]
    async fn test_create_without_candidates_stays_requested() {
        let f = fixture();
        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Requested);
        assert!(booking.ambulance_id.is_none());
        assert!(booking.assigned_at.is_none());
        assert!(f.sink.events_for("c-1").is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_citizen_role() {
        let f = fixture();
        assert!(matches!(
            f.service.create(&driver("d-1"), pickup(), None).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_share_one_ambulance_safely() {
        let f = fixture();
        let ambulance = ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;

        let a = {
            let service = f.service.clone();
            tokio::spawn(async move { service.create(&citizen("c-1"), pickup(), None).await })
        };
        let b = {
            let service = f.service.clone();
            tokio::spawn(async move {
                service
                    .create(&citizen("c-2"), coord("12.9717", "77.5947"), None)
                    .await
            })
        };

        let results = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        let assigned: Vec<_> = results
            .iter()
            .filter(|b| b.status == BookingStatus::Assigned)
            .collect();
        let requested: Vec<_> = results
            .iter()
            .filter(|b| b.status == BookingStatus::Requested)
            .collect();

        assert_eq!(assigned.len(), 1);
        assert_eq!(requested.len(), 1);
        assert_eq!(assigned[0].ambulance_id, Some(ambulance.id));
        assert!(requested[0].ambulance_id.is_none());
        assert_eq!(
            f.registry.get(ambulance.id).await.unwrap().current_booking_id,
            Some(assigned[0].id)
        );
    }

    #[tokio::test]
    async fn test_cancel_twice_is_invalid_transition() {
        let f = fixture();
        let ambulance = ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;
        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();

        let cancelled = f.service.cancel(booking.id, &citizen("c-1")).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let released = f.registry.get(ambulance.id).await.unwrap();
        assert!(released.available);
        assert!(released.current_booking_id.is_none());
        assert_eq!(
            f.sink.events_for("d-1").last().unwrap().title,
            TITLE_BOOKING_CANCELLED
        );

        assert!(matches!(
            f.service.cancel(booking.id, &citizen("c-1")).await,
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_checks_owner_and_window() {
        let f = fixture();
        ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;
        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();

        assert!(matches!(
            f.service.cancel(booking.id, &citizen("c-2")).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            f.service.cancel(Uuid::now_v7(), &citizen("c-1")).await,
            Err(AppError::NotFound(_))
        ));

        f.service
            .update_status(booking.id, BookingStatus::EnRoute, &driver("d-1"))
            .await
            .unwrap();
        assert!(matches!(
            f.service.cancel(booking.id, &citizen("c-1")).await,
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_requested_booking_without_ambulance() {
        let f = fixture();
        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();

        let cancelled = f.service.cancel(booking.id, &citizen("c-1")).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(cancelled.ambulance_id.is_none());
    }

    #[tokio::test]
    async fn test_driver_path_to_completion() {
        let f = fixture();
        let ambulance = ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;
        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();
        let d = driver("d-1");

        f.service
            .update_status(booking.id, BookingStatus::EnRoute, &d)
            .await
            .unwrap();
        let arrived = f
            .service
            .update_status(booking.id, BookingStatus::Arrived, &d)
            .await
            .unwrap();
        assert!(arrived.completed_at.is_none());
        assert!(!f.registry.get(ambulance.id).await.unwrap().available);

        let before = f.sink.events_for("c-1").len();
        let completed = f
            .service
            .update_status(booking.id, BookingStatus::Completed, &d)
            .await
            .unwrap();

        assert_eq!(completed.status, BookingStatus::Completed);
        assert!(completed.completed_at.unwrap() >= completed.assigned_at.unwrap());
        assert!(f.registry.get(ambulance.id).await.unwrap().available);

        let after = f.sink.events_for("c-1");
        assert_eq!(after.len(), before + 1);
        assert_eq!(after.last().unwrap().title, TITLE_BOOKING_STATUS_UPDATED);
    }

    #[tokio::test]
    async fn test_update_status_guards() {
        let f = fixture();
        ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;
        ready_ambulance(&f, "d-2", "AMB002", "40.0", "40.0").await;
        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();

        assert!(matches!(
            f.service
                .update_status(booking.id, BookingStatus::EnRoute, &driver("d-2"))
                .await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            f.service
                .update_status(booking.id, BookingStatus::EnRoute, &citizen("c-1"))
                .await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            f.service
                .update_status(booking.id, BookingStatus::Completed, &driver("d-1"))
                .await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            f.service
                .update_status(booking.id, BookingStatus::Cancelled, &driver("d-1"))
                .await,
            Err(AppError::InvalidTransition(_))
        ));
        assert_eq!(
            f.service.get(booking.id, &citizen("c-1")).await.unwrap().status,
            BookingStatus::Assigned
        );
    }

    #[tokio::test]
    async fn test_get_visibility() {
        let f = fixture();
        ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;
        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();

        assert!(f.service.get(booking.id, &citizen("c-1")).await.is_ok());
        assert!(f.service.get(booking.id, &driver("d-1")).await.is_ok());
        assert!(f
            .service
            .get(booking.id, &AuthenticatedUser::new("admin", Role::SuperAdmin))
            .await
            .is_ok());
        assert!(matches!(
            f.service.get(booking.id, &citizen("c-2")).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            f.service
                .get(booking.id, &AuthenticatedUser::new("c-1", Role::HospitalAdmin))
                .await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_lists_for_citizen_and_driver() {
        let f = fixture();
        ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;
        let first = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();
        let second = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();
        f.service.create(&citizen("c-2"), pickup(), None).await.unwrap();

        let (items, total) = f
            .service
            .list_for_citizen(&citizen("c-1"), &PaginationQuery::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(items[0].id, second.id);

        let assigned = f.service.list_for_driver(&driver("d-1")).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, first.id);

        assert!(f
            .service
            .list_for_driver(&driver("unregistered"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_retry_assignment_after_ambulance_frees_up() {
        let f = fixture();
        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();

        let unchanged = f
            .service
            .retry_assignment(booking.id, &citizen("c-1"))
            .await
            .unwrap();
        assert_eq!(unchanged.status, BookingStatus::Requested);

        let ambulance = ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;
        assert!(matches!(
            f.service.retry_assignment(booking.id, &citizen("c-2")).await,
            Err(AppError::Unauthorized(_))
        ));

        let assigned = f
            .service
            .retry_assignment(booking.id, &citizen("c-1"))
            .await
            .unwrap();
        assert_eq!(assigned.status, BookingStatus::Assigned);
        assert_eq!(assigned.ambulance_id, Some(ambulance.id));

        assert!(matches!(
            f.service.retry_assignment(booking.id, &citizen("c-1")).await,
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_assign_requested_batch() {
        let f = fixture();
        let oldest = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();
        let newer = f.service.create(&citizen("c-2"), pickup(), None).await.unwrap();
        let ambulance = ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;

        assert_eq!(f.service.assign_requested_batch(10).await.unwrap(), 1);

        let admin = AuthenticatedUser::new("admin", Role::SuperAdmin);
        let oldest = f.service.get(oldest.id, &admin).await.unwrap();
        assert_eq!(oldest.ambulance_id, Some(ambulance.id));
        assert_eq!(
            f.service.get(newer.id, &admin).await.unwrap().status,
            BookingStatus::Requested
        );
    }

    #[tokio::test]
    async fn test_reconcile_releases_orphaned_claims_only() {
        let f = fixture();
        let active = ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;
        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();
        assert_eq!(booking.ambulance_id, Some(active.id));

        let orphan = ready_ambulance(&f, "d-2", "AMB002", "40.0", "40.0").await;
        f.registry.claim(orphan.id, Uuid::now_v7()).await.unwrap();

        // Fresh claims are inside the grace window
        assert_eq!(
            f.service.reconcile_claims(Duration::minutes(5)).await.unwrap(),
            0
        );
        assert!(!f.registry.get(orphan.id).await.unwrap().available);

        assert_eq!(f.service.reconcile_claims(Duration::zero()).await.unwrap(), 1);
        assert!(f.registry.get(orphan.id).await.unwrap().available);
        assert!(!f.registry.get(active.id).await.unwrap().available);
    }

    /// Store whose inserts always fail, to exercise claim compensation
    struct FailingInsertStore(InMemoryBookingStore);

    #[async_trait]
    impl BookingStore for FailingInsertStore {
        async fn insert(&self, _booking: &Booking) -> Result<()> {
            Err(AppError::Internal("insert failed".to_string()))
        }

        async fn get(&self, id: Uuid) -> Result<Option<Booking>> {
            self.0.get(id).await
        }

        async fn list_by_citizen(
            &self,
            citizen_id: &str,
            offset: i64,
            limit: i64,
        ) -> Result<(Vec<Booking>, i64)> {
            self.0.list_by_citizen(citizen_id, offset, limit).await
        }

        async fn list_active_by_ambulance(&self, ambulance_id: Uuid) -> Result<Vec<Booking>> {
            self.0.list_active_by_ambulance(ambulance_id).await
        }

        async fn list_requested(&self, limit: i64) -> Result<Vec<Booking>> {
            self.0.list_requested(limit).await
        }

        async fn transition(
            &self,
            id: Uuid,
            expected: BookingStatus,
            transition: BookingTransition,
        ) -> Result<Option<Booking>> {
            self.0.transition(id, expected, transition).await
        }
    }

    #[tokio::test]
    async fn test_failed_insert_releases_claim() {
        let f = fixture_with_store(Arc::new(FailingInsertStore(InMemoryBookingStore::new())));
        let ambulance = ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;

        assert!(matches!(
            f.service.create(&citizen("c-1"), pickup(), None).await,
            Err(AppError::Internal(_))
        ));

        let after = f.registry.get(ambulance.id).await.unwrap();
        assert!(after.available);
        assert!(after.current_booking_id.is_none());
        assert!(f.sink.events_for("c-1").is_empty());
    }


    /// Ambulance store that can lose claim races to a rival booking and serve a
    /// stale `list_claimed` snapshot
    #[derive(Default)]
    struct ContendedAmbulanceStore {
        inner: InMemoryAmbulanceStore,
        races_to_lose: AtomicUsize,
        claim_attempts: AtomicUsize,
        stale_claims: Mutex<Option<Vec<Ambulance>>>,
    }

    impl ContendedAmbulanceStore {
        fn losing(races: usize) -> Self {
            Self {
                races_to_lose: AtomicUsize::new(races),
                ..Default::default()
            }
        }

        fn serve_stale_claims(&self, snapshot: Vec<Ambulance>) {
            *self.stale_claims.lock().unwrap() = Some(snapshot);
        }
    }

    #[async_trait]
    impl AmbulanceStore for ContendedAmbulanceStore {
        async fn insert(&self, ambulance: &Ambulance) -> Result<()> {
            self.inner.insert(ambulance).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<Ambulance>> {
            self.inner.get(id).await
        }

        async fn find_by_driver(&self, driver_id: &str) -> Result<Option<Ambulance>> {
            self.inner.find_by_driver(driver_id).await
        }

        async fn list_candidates(&self) -> Result<Vec<Ambulance>> {
            self.inner.list_candidates().await
        }

        async fn list_pending_approval(&self) -> Result<Vec<Ambulance>> {
            self.inner.list_pending_approval().await
        }

        async fn list_claimed(&self) -> Result<Vec<Ambulance>> {
            if let Some(snapshot) = self.stale_claims.lock().unwrap().take() {
                return Ok(snapshot);
            }
            self.inner.list_claimed().await
        }

        async fn claim(&self, id: Uuid, booking_id: Uuid) -> Result<Option<Ambulance>> {
            self.claim_attempts.fetch_add(1, Ordering::SeqCst);
            let lose = self
                .races_to_lose
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if lose {
                // A rival booking gets there first
                self.inner.claim(id, Uuid::now_v7()).await?;
                return Ok(None);
            }
            self.inner.claim(id, booking_id).await
        }

        async fn release(&self, id: Uuid, booking_id: Uuid) -> Result<Option<Ambulance>> {
            self.inner.release(id, booking_id).await
        }

        async fn approve(&self, id: Uuid) -> Result<Option<Ambulance>> {
            self.inner.approve(id).await
        }

        async fn update_position(
            &self,
            id: Uuid,
            driver_id: &str,
            position: Coordinate,
            at: DateTime<Utc>,
        ) -> Result<Option<Ambulance>> {
            self.inner.update_position(id, driver_id, position, at).await
        }

        async fn set_availability(
            &self,
            id: Uuid,
            driver_id: &str,
            available: bool,
        ) -> Result<Option<Ambulance>> {
            self.inner.set_availability(id, driver_id, available).await
        }
    }

    #[tokio::test]
    async fn test_reconcile_skips_claim_taken_over_since_snapshot() {
        let ambulances = Arc::new(ContendedAmbulanceStore::default());
        let f = fixture_with(Arc::new(InMemoryBookingStore::new()), ambulances.clone());
        let ambulance = ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;

        let first = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();
        let snapshot = f.registry.list_claimed().await.unwrap();
        assert_eq!(snapshot[0].current_booking_id, Some(first.id));

        // Between the snapshot and the release, c-1 cancels and c-2 takes the ambulance
        f.service.cancel(first.id, &citizen("c-1")).await.unwrap();
        let second = f.service.create(&citizen("c-2"), pickup(), None).await.unwrap();
        assert_eq!(second.ambulance_id, Some(ambulance.id));

        ambulances.serve_stale_claims(snapshot);
        assert_eq!(f.service.reconcile_claims(Duration::zero()).await.unwrap(), 0);

        let after = f.registry.get(ambulance.id).await.unwrap();
        assert!(!after.available);
        assert_eq!(after.current_booking_id, Some(second.id));
        assert!(f.registry.list_available().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lost_claim_rematches_next_candidate() {
        let ambulances = Arc::new(ContendedAmbulanceStore::losing(1));
        let f = fixture_with(Arc::new(InMemoryBookingStore::new()), ambulances.clone());
        let near = ready_ambulance(&f, "d-near", "AMB001", "12.9716", "77.5946").await;
        let far = ready_ambulance(&f, "d-far", "AMB002", "13.05", "77.60").await;

        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Assigned);
        assert_eq!(booking.ambulance_id, Some(far.id));
        assert_eq!(ambulances.claim_attempts.load(Ordering::SeqCst), 2);
        assert_ne!(
            f.registry.get(near.id).await.unwrap().current_booking_id,
            Some(booking.id)
        );
        assert_eq!(
            f.registry.get(far.id).await.unwrap().current_booking_id,
            Some(booking.id)
        );
    }

    #[tokio::test]
    async fn test_claim_gives_up_after_one_rematch() {
        let ambulances = Arc::new(ContendedAmbulanceStore::losing(usize::MAX));
        let f = fixture_with(Arc::new(InMemoryBookingStore::new()), ambulances.clone());
        ready_ambulance(&f, "d-1", "AMB001", "12.9716", "77.5946").await;
        ready_ambulance(&f, "d-2", "AMB002", "12.98", "77.60").await;
        let spare = ready_ambulance(&f, "d-3", "AMB003", "13.05", "77.60").await;

        let booking = f.service.create(&citizen("c-1"), pickup(), None).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Requested);
        assert!(booking.ambulance_id.is_none());
        assert_eq!(
            ambulances.claim_attempts.load(Ordering::SeqCst),
            CLAIM_RETRIES + 1
        );
        assert!(f.registry.get(spare.id).await.unwrap().available);
        assert!(f.sink.events_for("c-1").is_empty());
    }
}
