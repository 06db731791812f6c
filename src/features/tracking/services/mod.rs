mod tracking_hub;
mod tracking_service;

pub use tracking_hub::TrackingHub;
pub use tracking_service::{TrackingService, TrackingUpdate};
