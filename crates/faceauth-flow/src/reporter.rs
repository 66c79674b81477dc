use faceauth_types::{
    events::CameraEvent,
    operation::{OperationResult, Outcome},
    status::StatusState,
    FaceAuthError, Result,
};

pub const CAMERA_STARTED: &str = "Camera started successfully.";
pub const CAMERA_STOPPED: &str = "Camera stopped.";

/// Maps results and lifecycle events onto what the user sees. Pure.
pub struct StatusReporter;

impl StatusReporter {
    pub fn report(result: &Result<OperationResult>) -> StatusState {
        match result {
            Ok(result) => Self::report_result(result),
            Err(err) => Self::report_error(err),
        }
    }

    pub fn report_result(result: &OperationResult) -> StatusState {
        match result.outcome {
            Outcome::Success => StatusState::success(result.message.clone()),
            Outcome::Failure => StatusState::error(result.message.clone()),
        }
    }

    pub fn report_error(err: &FaceAuthError) -> StatusState {
        StatusState::error(err.user_message())
    }

    pub fn camera(event: CameraEvent) -> StatusState {
        match event {
            CameraEvent::Started => StatusState::info(CAMERA_STARTED),
            CameraEvent::Stopped => StatusState::info(CAMERA_STOPPED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceauth_types::status::StatusKind;

    #[test]
    fn maps_success_failure_and_lifecycle() {
        let ok = StatusReporter::report(&Ok(OperationResult::success("Enrolled u1", 200)));
        assert_eq!(ok, StatusState::success("Enrolled u1"));

        let api = StatusReporter::report(&Err(FaceAuthError::Api {
            status: 401,
            message: "Face mismatch".into(),
        }));
        assert_eq!(api, StatusState::error("Face mismatch"));

        let device = StatusReporter::report_error(&FaceAuthError::Device("denied".into()));
        assert_eq!(device, StatusState::error("Failed to access camera."));

        let failure = StatusReporter::report_result(&OperationResult {
            outcome: Outcome::Failure,
            message: "rejected".into(),
            status_code: 200,
        });
        assert_eq!(failure.kind, StatusKind::Error);

        assert_eq!(
            StatusReporter::camera(CameraEvent::Started),
            StatusState::info("Camera started successfully.")
        );
        assert_eq!(
            StatusReporter::camera(CameraEvent::Stopped).kind,
            StatusKind::Info
        );
    }
}
