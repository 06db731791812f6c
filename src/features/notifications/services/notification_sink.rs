use tokio::sync::mpsc::{self, error::TrySendError};

use crate::features::notifications::models::NotificationEvent;

/// Outbound notification boundary.
///
/// `publish` never blocks and never fails the caller: state transitions commit
/// first and notification delivery is best effort.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, event: NotificationEvent);
}

/// Sink backed by a bounded mpsc queue drained by `NotificationWorker`
#[derive(Clone)]
pub struct ChannelNotificationSink {
    sender: mpsc::Sender<NotificationEvent>,
}

impl ChannelNotificationSink {
    /// Creates the sink and the receiving half for the worker
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn publish(&self, event: NotificationEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    "Notification queue full, dropping '{}' for user {}",
                    event.title,
                    event.user_id
                );
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    "Notification queue closed, dropping '{}' for user {}",
                    event.title,
                    event.user_id
                );
            }
        }
    }
}
