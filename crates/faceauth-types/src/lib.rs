//! Shared domain types for the FaceAuth client.

pub mod config;
pub mod events;
pub mod frame;
pub mod operation;
pub mod status;

mod errors;

pub use errors::{FaceAuthError, Result};
