pub mod ambulance_dto;

pub use ambulance_dto::{
    AmbulanceResponseDto, AvailabilityUpdateDto, LocationUpdateDto, RegisterAmbulanceDto,
};
