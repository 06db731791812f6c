mod ambulance;

pub use ambulance::{Ambulance, Candidate};
