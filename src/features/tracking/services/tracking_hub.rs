use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::features::tracking::models::TrackingMessage;

/// One broadcast channel per booking, created on first subscribe
pub struct TrackingHub {
    channels: DashMap<Uuid, broadcast::Sender<TrackingMessage>>,
    capacity: usize,
}

impl TrackingHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, booking_id: Uuid) -> broadcast::Receiver<TrackingMessage> {
        self.channels
            .entry(booking_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Returns the number of subscribers reached. A channel with no
    /// receivers left is dropped.
    pub fn publish(&self, message: TrackingMessage) -> usize {
        let booking_id = message.booking_id;
        let delivered = match self.channels.get(&booking_id) {
            Some(sender) => sender.send(message).ok(),
            None => return 0,
        };

        match delivered {
            Some(count) => count,
            None => {
                self.channels
                    .remove_if(&booking_id, |_, sender| sender.receiver_count() == 0);
                0
            }
        }
    }

    /// Drops the booking's channel, ending every open stream
    pub fn close(&self, booking_id: Uuid) {
        self.channels.remove(&booking_id);
    }

    #[cfg(test)]
    fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn message(booking_id: Uuid) -> TrackingMessage {
        TrackingMessage {
            booking_id,
            ambulance_id: Uuid::now_v7(),
            latitude: Decimal::new(129716, 4),
            longitude: Decimal::new(775946, 4),
            timestamp: Utc::now(),
            speed: Some(42.0),
            heading: None,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_only_that_booking() {
        let hub = TrackingHub::new(8);
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let mut rx_a = hub.subscribe(a);
        let mut rx_b = hub.subscribe(b);

        assert_eq!(hub.publish(message(a)), 1);

        assert_eq!(rx_a.recv().await.unwrap().booking_id, a);
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = TrackingHub::new(8);
        let id = Uuid::now_v7();
        assert_eq!(hub.publish(message(id)), 0);

        let rx = hub.subscribe(id);
        drop(rx);
        assert_eq!(hub.publish(message(id)), 0);
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_close_ends_streams() {
        let hub = TrackingHub::new(8);
        let id = Uuid::now_v7();
        let mut rx = hub.subscribe(id);

        hub.close(id);
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
