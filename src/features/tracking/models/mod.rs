mod tracking_message;

pub use tracking_message::TrackingMessage;
