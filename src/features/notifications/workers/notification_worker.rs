use std::sync::Arc;

use tokio::sync::mpsc;

use crate::features::notifications::models::{Notification, NotificationEvent};
use crate::features::notifications::stores::NotificationStore;

/// Drains the notification queue into the inbox store.
///
/// Delivery failures are logged and dropped; nothing upstream waits on them.
pub struct NotificationWorker {
    store: Arc<dyn NotificationStore>,
    receiver: mpsc::Receiver<NotificationEvent>,
}

impl NotificationWorker {
    pub fn new(store: Arc<dyn NotificationStore>, receiver: mpsc::Receiver<NotificationEvent>) -> Self {
        Self { store, receiver }
    }

    /// Runs until every sender is dropped
    pub async fn run(mut self) {
        tracing::info!("Starting notification worker");

        while let Some(event) = self.receiver.recv().await {
            self.deliver(event).await;
        }

        tracing::info!("Notification queue closed, worker stopping");
    }

    async fn deliver(&self, event: NotificationEvent) {
        let notification = Notification::from(event);
        match self.store.insert(&notification).await {
            Ok(()) => tracing::debug!(
                "Delivered notification {} to user {}",
                notification.id,
                notification.user_id
            ),
            Err(e) => tracing::error!(
                "Failed to deliver notification to user {}: {:?}",
                notification.user_id,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::notifications::services::{ChannelNotificationSink, NotificationSink};
    use crate::features::notifications::stores::InMemoryNotificationStore;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_worker_writes_events_to_inbox() {
        let store = Arc::new(InMemoryNotificationStore::new());
        let (sink, receiver) = ChannelNotificationSink::channel(8);
        let worker = NotificationWorker::new(store.clone(), receiver);

        let booking_id = Uuid::now_v7();
        sink.publish(NotificationEvent::booking_update(
            "citizen-1",
            booking_id,
            "Ambulance Assigned",
            "On the way",
        ));
        drop(sink);
        worker.run().await;

        let (items, total) = store.list_by_user("citizen-1", 0, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].booking_id, Some(booking_id));
        assert!(!items[0].is_read);
    }
}
