use serde::{Deserialize, Serialize};

use crate::{frame::CapturedFrame, FaceAuthError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Enroll,
    Verify,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Enroll => "enroll",
            OperationKind::Verify => "verify",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-entered fields that accompany a capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMetadata {
    pub user_id: String,
    pub full_name: Option<String>,
}

impl FlowMetadata {
    pub fn enroll(user_id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            full_name: Some(full_name.into()),
        }
    }

    pub fn verify(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            full_name: None,
        }
    }

    /// Checks the fields `kind` requires. Whitespace-only values count as missing.
    pub fn validate_for(&self, kind: OperationKind) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(FaceAuthError::Validation("User ID is required.".into()));
        }
        if kind == OperationKind::Enroll
            && self
                .full_name
                .as_deref()
                .map_or(true, |name| name.trim().is_empty())
        {
            return Err(FaceAuthError::Validation("Full name is required.".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    pub user_id: String,
    pub full_name: String,
    pub frame: CapturedFrame,
}

#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub user_id: String,
    pub frame: CapturedFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub outcome: Outcome,
    pub message: String,
    pub status_code: u16,
}

impl OperationResult {
    pub fn success(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            outcome: Outcome::Success,
            message: message.into(),
            status_code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enroll_requires_user_id_and_full_name() {
        assert!(FlowMetadata::enroll("u1", "Alice")
            .validate_for(OperationKind::Enroll)
            .is_ok());
        assert!(matches!(
            FlowMetadata::enroll("", "Alice").validate_for(OperationKind::Enroll),
            Err(FaceAuthError::Validation(_))
        ));
        assert!(FlowMetadata::enroll("u1", "  ")
            .validate_for(OperationKind::Enroll)
            .is_err());
        assert!(FlowMetadata::verify("u1")
            .validate_for(OperationKind::Enroll)
            .is_err());
    }

    #[test]
    fn verify_requires_only_user_id() {
        assert!(FlowMetadata::verify("u2")
            .validate_for(OperationKind::Verify)
            .is_ok());
        assert!(FlowMetadata::verify(" ")
            .validate_for(OperationKind::Verify)
            .is_err());
    }
}
