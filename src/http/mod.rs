//! HTTP protocol layer module
//!
//! Converts between hyper requests/responses and the router's descriptors,
//! decoupled from the user logic itself.

pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{into_descriptor, RequestError};
pub use response::{
    build_413_response, build_bad_request_response, build_descriptor_response,
    build_fault_response, build_health_response,
};
