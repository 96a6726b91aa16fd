//! Request handler module
//!
//! Entry point for every HTTP request: health probes, body/query extraction
//! and dispatch to the user router.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
