mod notification;

pub use notification::{Notification, NotificationCategory, NotificationEvent};
