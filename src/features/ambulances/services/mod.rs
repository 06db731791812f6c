mod matcher_service;
mod registry_service;

pub use matcher_service::{select_nearest, DispatchMatcher, Match};
pub use registry_service::ResourceRegistry;
