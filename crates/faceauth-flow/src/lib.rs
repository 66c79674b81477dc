//! Enrollment and verification flows coordinating camera, capture, and client.

mod controller;
pub mod dashboard;
mod feed;
mod form;
mod reporter;
#[cfg(test)]
mod test_support;

pub use controller::{FlowController, FlowOutcome};
pub use dashboard::AuthDashboard;
pub use feed::StatusFeed;
pub use form::OperationForm;
pub use reporter::{StatusReporter, CAMERA_STARTED, CAMERA_STOPPED};
