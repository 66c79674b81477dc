//! Owner of the camera session and the two operation flows bound to it.

use std::sync::Arc;

use faceauth_camera::{
    spawn_preview, CameraBackend, CameraConstraints, CameraController, CameraSession,
    PreviewHandle,
};
use faceauth_capture::{FrameCapturer, FrameEncoder, JpegEncoder};
use faceauth_client::SubmissionClient;
use faceauth_ops::StatusLog;
use faceauth_types::{
    events::CameraEvent,
    operation::OperationKind,
    status::StatusState,
    FaceAuthError,
};
use tokio::time::Duration;
use tracing::{info, warn};

use crate::{
    controller::{FlowController, FlowOutcome},
    feed::StatusFeed,
    form::OperationForm,
    reporter::StatusReporter,
};

struct ActiveCamera<C, E>
where
    C: SubmissionClient,
    E: FrameEncoder,
{
    preview: PreviewHandle,
    enroll: Arc<FlowController<C, E>>,
    verify: Arc<FlowController<C, E>>,
    session: CameraSession,
}

pub struct AuthDashboard<B, C, E = JpegEncoder>
where
    B: CameraBackend,
    C: SubmissionClient,
    E: FrameEncoder,
{
    camera: CameraController<B>,
    client: Arc<C>,
    capturer: Arc<FrameCapturer<E>>,
    feed: StatusFeed,
    log: StatusLog,
    preview_interval: Duration,
    active: Option<ActiveCamera<C, E>>,
}

impl<B, C, E> AuthDashboard<B, C, E>
where
    B: CameraBackend,
    C: SubmissionClient,
    E: FrameEncoder,
{
    pub fn new(
        camera: CameraController<B>,
        client: Arc<C>,
        capturer: Arc<FrameCapturer<E>>,
        feed: StatusFeed,
        log: StatusLog,
        preview_interval: Duration,
    ) -> Self {
        Self {
            camera,
            client,
            capturer,
            feed,
            log,
            preview_interval,
            active: None,
        }
    }

    pub fn camera(&self) -> &CameraController<B> {
        &self.camera
    }

    pub fn capturer(&self) -> &FrameCapturer<E> {
        &self.capturer
    }

    pub fn feed(&self) -> &StatusFeed {
        &self.feed
    }

    pub fn log(&self) -> &StatusLog {
        &self.log
    }

    pub fn is_camera_on(&self) -> bool {
        self.active
            .as_ref()
            .map_or(false, |active| active.session.is_open())
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.active.as_ref().map(|active| &active.preview)
    }

    pub fn flow(&self, kind: OperationKind) -> Option<Arc<FlowController<C, E>>> {
        self.active.as_ref().map(|active| match kind {
            OperationKind::Enroll => Arc::clone(&active.enroll),
            OperationKind::Verify => Arc::clone(&active.verify),
        })
    }

    pub async fn start_camera(&mut self, constraints: CameraConstraints) -> StatusState {
        if self.is_camera_on() {
            return StatusState::info("Camera already running.");
        }
        // A session closed out from under us is dropped before re-acquiring.
        self.active = None;

        let status = match self.camera.acquire(constraints).await {
            Ok(session) => {
                let handle = session.handle();
                let flow = |kind| {
                    Arc::new(FlowController::new(
                        kind,
                        handle.clone(),
                        Arc::clone(&self.capturer),
                        Arc::clone(&self.client),
                        self.feed.clone(),
                    ))
                };
                let enroll = flow(OperationKind::Enroll);
                let verify = flow(OperationKind::Verify);
                let preview = spawn_preview(handle.clone(), self.preview_interval);
                self.active = Some(ActiveCamera {
                    preview,
                    enroll,
                    verify,
                    session,
                });
                StatusReporter::camera(CameraEvent::Started)
            }
            Err(err) => {
                warn!("Camera start failed: {}", err);
                StatusReporter::report_error(&err)
            }
        };
        self.log.record(None, status.clone()).await;
        status
    }

    pub async fn stop_camera(&mut self) -> StatusState {
        if let Some(active) = self.active.take() {
            let ActiveCamera {
                preview,
                mut session,
                ..
            } = active;
            preview.cancel();
            self.camera.release(&mut session);
            info!("Camera stopped");
        }
        let status = StatusReporter::camera(CameraEvent::Stopped);
        self.log.record(None, status.clone()).await;
        status
    }

    /// Submits `form` through the matching flow and records the status shown.
    /// Missing fields are reported ahead of a stopped camera, as the flow does.
    pub async fn submit(&self, form: &mut OperationForm) -> StatusState {
        let outcome = match (self.flow(form.kind()), form.metadata().validate_for(form.kind())) {
            (Some(flow), _) => form.submit(&flow).await,
            (None, Err(err)) => FlowOutcome {
                operation: form.kind(),
                result: Err(err),
            },
            (None, Ok(())) => FlowOutcome {
                operation: form.kind(),
                result: Err(FaceAuthError::Validation("Camera not ready.".into())),
            },
        };
        let status = outcome.status();
        self.log.record(Some(outcome.operation), status.clone()).await;
        status
    }
}
