use faceauth_capture::FrameEncoder;
use faceauth_client::SubmissionClient;
use faceauth_types::{
    operation::{FlowMetadata, OperationKind},
    FaceAuthError,
};

use crate::controller::{FlowController, FlowOutcome};

/// Text inputs for one operation panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationForm {
    kind: OperationKind,
    pub user_id: String,
    pub full_name: String,
}

impl OperationForm {
    pub fn enroll() -> Self {
        Self {
            kind: OperationKind::Enroll,
            user_id: String::new(),
            full_name: String::new(),
        }
    }

    pub fn verify() -> Self {
        Self {
            kind: OperationKind::Verify,
            user_id: String::new(),
            full_name: String::new(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn metadata(&self) -> FlowMetadata {
        match self.kind {
            OperationKind::Enroll => FlowMetadata::enroll(&self.user_id, &self.full_name),
            OperationKind::Verify => FlowMetadata::verify(&self.user_id),
        }
    }

    pub fn clear(&mut self) {
        self.user_id.clear();
        self.full_name.clear();
    }

    /// Runs the form through `controller`. A successful enrollment empties the inputs.
    pub async fn submit<C, E>(&mut self, controller: &FlowController<C, E>) -> FlowOutcome
    where
        C: SubmissionClient,
        E: FrameEncoder,
    {
        if controller.kind() != self.kind {
            return FlowOutcome {
                operation: controller.kind(),
                result: Err(FaceAuthError::Validation(format!(
                    "{} form submitted to {} flow",
                    self.kind,
                    controller.kind()
                ))),
            };
        }
        let outcome = controller.start(&self.metadata()).await;
        if outcome.is_success() && self.kind == OperationKind::Enroll {
            self.clear();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_follows_form_kind() {
        let enroll = OperationForm::enroll()
            .with_user_id("u1")
            .with_full_name("Alice");
        assert_eq!(enroll.metadata(), FlowMetadata::enroll("u1", "Alice"));

        let verify = OperationForm::verify()
            .with_user_id("u2")
            .with_full_name("ignored");
        assert_eq!(verify.metadata(), FlowMetadata::verify("u2"));
    }
}
