pub mod ambulances;
pub mod auth;
pub mod bookings;
pub mod notifications;
pub mod tracking;
