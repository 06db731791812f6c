pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod stores;
pub mod workers;

pub use services::{ChannelNotificationSink, NotificationService, NotificationSink};
pub use workers::NotificationWorker;
