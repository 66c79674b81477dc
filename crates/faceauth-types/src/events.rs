use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::operation::OperationKind;

/// Stages of a single enroll or verify run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    Idle,
    Capturing,
    Encoding,
    Submitting,
    Success,
    Error,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Success | FlowState::Error)
    }
}

/// Camera lifecycle notifications surfaced as informational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraEvent {
    Started,
    Stopped,
}

/// Immutable record of one state transition, for observers and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEvent {
    pub id: Uuid,
    pub operation: OperationKind,
    pub state: FlowState,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FlowEvent {
    pub fn new(operation: OperationKind, state: FlowState, details: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            state,
            details,
            timestamp: Utc::now(),
        }
    }
}
