pub mod booking_handler;

pub use booking_handler::{
    __path_cancel_booking, __path_create_booking, __path_get_booking,
    __path_list_assigned_bookings, __path_list_my_bookings, __path_retry_booking,
    __path_update_booking_status, cancel_booking, create_booking, get_booking,
    list_assigned_bookings, list_my_bookings, retry_booking, update_booking_status,
};
