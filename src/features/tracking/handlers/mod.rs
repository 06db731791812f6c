pub mod tracking_handler;

pub use tracking_handler::{
    __path_push_location, __path_stream_locations, push_location, stream_locations,
};
