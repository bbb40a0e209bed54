//! Docvault API Library
//!
//! HTTP surface of the document service: routing, identity extraction, error
//! rendering and application setup.

pub mod constants;
pub mod error;
mod handlers;
pub mod identity;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::ErrorResponse;
pub use setup::routes::build_router;
