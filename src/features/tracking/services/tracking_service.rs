use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::TrackingHub;
use crate::core::error::{AppError, Result};
use crate::features::ambulances::ResourceRegistry;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::bookings::models::BookingStatus;
use crate::features::bookings::BookingService;
use crate::features::tracking::models::TrackingMessage;
use crate::shared::geo::Coordinate;

/// Driver position push for one booking
#[derive(Debug, Clone, Copy)]
pub struct TrackingUpdate {
    pub position: Coordinate,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
}

/// Relays driver positions to the booking's subscribers.
///
/// Positions are written through the registry first, so the matcher sees the
/// same location that subscribers do.
pub struct TrackingService {
    hub: Arc<TrackingHub>,
    bookings: Arc<BookingService>,
    registry: Arc<ResourceRegistry>,
}

impl TrackingService {
    pub fn new(
        hub: Arc<TrackingHub>,
        bookings: Arc<BookingService>,
        registry: Arc<ResourceRegistry>,
    ) -> Self {
        Self {
            hub,
            bookings,
            registry,
        }
    }

    pub async fn push(
        &self,
        booking_id: Uuid,
        update: TrackingUpdate,
        caller: &AuthenticatedUser,
    ) -> Result<TrackingMessage> {
        let booking = self
            .bookings
            .get_for_assigned_driver(booking_id, caller)
            .await?;
        if booking.status.is_terminal() {
            self.hub.close(booking_id);
            return Err(tracking_ended(booking_id, booking.status));
        }
        let ambulance_id = booking.ambulance_id.ok_or_else(|| {
            AppError::Internal(format!("Booking {} has no ambulance", booking_id))
        })?;

        let ambulance = self
            .registry
            .update_position(ambulance_id, update.position, &caller.user_id)
            .await?;

        let message = TrackingMessage {
            booking_id,
            ambulance_id,
            latitude: update.position.latitude(),
            longitude: update.position.longitude(),
            timestamp: ambulance.last_location_update.unwrap_or_else(Utc::now),
            speed: update.speed,
            heading: update.heading,
        };

        let reached = self.hub.publish(message.clone());
        tracing::debug!(
            "Tracking update for booking {} relayed to {} subscribers",
            booking_id,
            reached
        );

        Ok(message)
    }

    /// Open a live feed; allowed for anyone who may read the booking while it
    /// is still active
    pub async fn subscribe(
        &self,
        booking_id: Uuid,
        caller: &AuthenticatedUser,
    ) -> Result<broadcast::Receiver<TrackingMessage>> {
        let booking = self.bookings.get(booking_id, caller).await?;
        if booking.status.is_terminal() {
            return Err(tracking_ended(booking_id, booking.status));
        }

        let receiver = self.hub.subscribe(booking_id);

        // The booking may have finished, and closed its channel, between the
        // read and the subscribe
        let booking = self.bookings.get(booking_id, caller).await?;
        if booking.status.is_terminal() {
            self.hub.close(booking_id);
            return Err(tracking_ended(booking_id, booking.status));
        }

        Ok(receiver)
    }
}

fn tracking_ended(booking_id: Uuid, status: BookingStatus) -> AppError {
    AppError::InvalidTransition(format!(
        "Booking {} is {}, tracking has ended",
        booking_id, status
    ))
}
