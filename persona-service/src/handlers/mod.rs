//! HTTP handlers for the persona service.

pub mod ask;
pub mod status;

pub use ask::ask;
pub use status::{not_found, status};
