//! Request and response shapes for the HTTP surface.

pub mod ask;

pub use ask::{AskRequest, AskResponse, StatusResponse};
