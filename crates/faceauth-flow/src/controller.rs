//! Per-operation state machine: capture, encode, submit, report.

use std::sync::{Arc, Mutex};

use faceauth_camera::SessionHandle;
use faceauth_capture::{FrameCapturer, FrameEncoder, JpegEncoder, RasterTarget};
use faceauth_client::SubmissionClient;
use faceauth_types::{
    events::{FlowEvent, FlowState},
    operation::{
        EnrollmentRequest, FlowMetadata, OperationKind, OperationResult, VerificationRequest,
    },
    status::StatusState,
    FaceAuthError, Result,
};
use tracing::{debug, info, warn};

use crate::{feed::StatusFeed, reporter::StatusReporter};

/// Result of one `start` call. Failures are values here, never panics or
/// propagated errors.
#[derive(Debug)]
pub struct FlowOutcome {
    pub operation: OperationKind,
    pub result: Result<OperationResult>,
}

impl FlowOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn status(&self) -> StatusState {
        StatusReporter::report(&self.result)
    }

    pub fn error(&self) -> Option<&FaceAuthError> {
        self.result.as_ref().err()
    }
}

pub struct FlowController<C, E = JpegEncoder>
where
    C: SubmissionClient,
    E: FrameEncoder,
{
    kind: OperationKind,
    session: SessionHandle,
    capturer: Arc<FrameCapturer<E>>,
    client: Arc<C>,
    feed: StatusFeed,
    state: Mutex<FlowState>,
}

impl<C, E> FlowController<C, E>
where
    C: SubmissionClient,
    E: FrameEncoder,
{
    pub fn new(
        kind: OperationKind,
        session: SessionHandle,
        capturer: Arc<FrameCapturer<E>>,
        client: Arc<C>,
        feed: StatusFeed,
    ) -> Self {
        Self {
            kind,
            session,
            capturer,
            client,
            feed,
            state: Mutex::new(FlowState::Idle),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn state(&self) -> FlowState {
        self.state.lock().map(|s| *s).unwrap_or(FlowState::Idle)
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Runs one capture-and-submit cycle. Rejected with `Busy` while a run is
    /// in flight, and with `Validation` before touching the camera when the
    /// metadata or session is not usable.
    pub async fn start(&self, metadata: &FlowMetadata) -> FlowOutcome {
        let result = self.execute(metadata).await;
        FlowOutcome {
            operation: self.kind,
            result,
        }
    }

    async fn execute(&self, metadata: &FlowMetadata) -> Result<OperationResult> {
        let _run = self.begin(metadata).map_err(|err| {
            warn!("{} not started: {}", self.kind, err);
            err
        })?;

        let result = self.run_stages(metadata).await;
        match &result {
            Ok(ok) => {
                info!("{} succeeded for {}: {}", self.kind, metadata.user_id, ok.message);
                self.transition(FlowState::Success, Some(ok.message.clone()));
            }
            Err(err) => {
                warn!("{} failed for {}: {}", self.kind, metadata.user_id, err);
                self.transition(FlowState::Error, Some(err.user_message()));
            }
        }
        result
    }

    fn begin(&self, metadata: &FlowMetadata) -> Result<RunGuard<'_, C, E>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| FaceAuthError::Ops("flow state lock poisoned".into()))?;
        if *state != FlowState::Idle {
            return Err(FaceAuthError::Busy(self.kind.to_string()));
        }
        metadata.validate_for(self.kind)?;
        if !self.session.is_open() {
            return Err(FaceAuthError::Validation("Camera not ready.".into()));
        }
        *state = FlowState::Capturing;
        drop(state);

        self.feed
            .publish(FlowEvent::new(self.kind, FlowState::Capturing, None));
        Ok(RunGuard { controller: self })
    }

    async fn run_stages(&self, metadata: &FlowMetadata) -> Result<OperationResult> {
        let raster = self.grab_raster()?;
        self.transition(FlowState::Encoding, None);

        let frame = self.capturer.encode(raster).await?;
        if !self.session.is_open() {
            return Err(FaceAuthError::SessionClosed);
        }
        self.transition(FlowState::Submitting, None);
        debug!(
            "{} submitting {}x{} frame ({} bytes)",
            self.kind,
            frame.width,
            frame.height,
            frame.len()
        );

        match self.kind {
            OperationKind::Enroll => {
                self.client
                    .enroll(EnrollmentRequest {
                        user_id: metadata.user_id.clone(),
                        full_name: metadata.full_name.clone().unwrap_or_default(),
                        frame,
                    })
                    .await
            }
            OperationKind::Verify => {
                self.client
                    .verify(VerificationRequest {
                        user_id: metadata.user_id.clone(),
                        frame,
                    })
                    .await
            }
        }
    }

    /// A session closed after `begin` reports as `SessionClosed`, like a
    /// close during encode.
    fn grab_raster(&self) -> Result<RasterTarget> {
        self.capturer.grab(&self.session).map_err(|err| match err {
            FaceAuthError::Capture(_) if !self.session.is_open() => FaceAuthError::SessionClosed,
            other => other,
        })
    }

    fn transition(&self, next: FlowState, details: Option<String>) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
        debug!("{} -> {:?}", self.kind, next);
        self.feed.publish(FlowEvent::new(self.kind, next, details));
    }
}

/// Returns the controller to `Idle` when a run ends, including when the run
/// future is dropped mid-flight.
struct RunGuard<'a, C, E>
where
    C: SubmissionClient,
    E: FrameEncoder,
{
    controller: &'a FlowController<C, E>,
}

impl<C, E> Drop for RunGuard<'_, C, E>
where
    C: SubmissionClient,
    E: FrameEncoder,
{
    fn drop(&mut self) {
        self.controller.transition(FlowState::Idle, None);
    }
}
