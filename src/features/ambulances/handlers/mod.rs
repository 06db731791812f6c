pub mod admin_handler;
pub mod ambulance_handler;

pub use admin_handler::{
    __path_approve_ambulance, __path_list_pending_ambulances, approve_ambulance,
    list_pending_ambulances,
};
pub use ambulance_handler::{
    __path_get_my_ambulance, __path_list_available_ambulances, __path_register_ambulance,
    __path_update_availability, __path_update_location, get_my_ambulance,
    list_available_ambulances, register_ambulance, update_availability, update_location,
};
