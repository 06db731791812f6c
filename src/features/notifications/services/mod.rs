mod notification_service;
mod notification_sink;

pub use notification_service::NotificationService;
pub use notification_sink::{ChannelNotificationSink, NotificationSink};
