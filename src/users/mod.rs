//! User records module
//!
//! Request/response descriptors, the BMI helper and the method router that
//! reads and writes user records through a [`RecordStore`](crate::store::RecordStore).

mod bmi;
mod record;
mod service;

pub use record::{RequestDescriptor, ResponseDescriptor, UserRecord};
pub use service::UserRouter;
