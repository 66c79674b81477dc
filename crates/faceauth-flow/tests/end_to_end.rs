use std::sync::Arc;

use faceauth_camera::{CameraConstraints, CameraController, PermissionPolicy, SyntheticCamera};
use faceauth_capture::FrameCapturer;
use faceauth_client::{testing::MockBackend, HttpSubmissionClient, ENROLL_PATH, VERIFY_PATH};
use faceauth_flow::{AuthDashboard, OperationForm, StatusFeed};
use faceauth_ops::StatusLog;
use faceauth_types::{
    config::ApiConfig,
    events::FlowState,
    frame::JPEG_MIME,
    status::{StatusKind, StatusState},
};
use futures::StreamExt;
use tokio::time::Duration;

fn dashboard(
    backend: &MockBackend,
    camera: SyntheticCamera,
) -> AuthDashboard<SyntheticCamera, HttpSubmissionClient> {
    let client = HttpSubmissionClient::new(&ApiConfig {
        base_url: backend.base_url(),
        ..ApiConfig::default()
    })
    .expect("http client");
    AuthDashboard::new(
        CameraController::new(camera),
        Arc::new(client),
        Arc::new(FrameCapturer::jpeg(85)),
        StatusFeed::default(),
        StatusLog::new(32),
        Duration::from_millis(50),
    )
}

#[tokio::test]
async fn enroll_then_verify_against_backend() {
    let backend = MockBackend::spawn().await;
    let mut dashboard = dashboard(&backend, SyntheticCamera::new());

    let started = dashboard.start_camera(CameraConstraints::default()).await;
    assert_eq!(started, StatusState::info("Camera started successfully."));

    let mut enroll = OperationForm::enroll()
        .with_user_id("u1")
        .with_full_name("Alice");
    let status = dashboard.submit(&mut enroll).await;
    assert_eq!(status, StatusState::success("Enrolled u1"));
    assert!(enroll.user_id.is_empty());
    assert!(enroll.full_name.is_empty());

    let mut verify = OperationForm::verify().with_user_id("u1");
    let status = dashboard.submit(&mut verify).await;
    assert_eq!(status, StatusState::success("Face verified"));

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, ENROLL_PATH);
    assert_eq!(requests[0].full_name.as_deref(), Some("Alice"));
    assert_eq!(requests[0].image_filename.as_deref(), Some("u1.jpg"));
    assert_eq!(requests[0].image_content_type.as_deref(), Some(JPEG_MIME));
    assert!(requests[0].image_bytes > 0);
    assert_eq!(requests[1].path, VERIFY_PATH);
    assert_eq!(requests[1].full_name, None);
    assert_eq!(backend.users(), vec!["u1".to_string()]);
}

#[tokio::test]
async fn mismatched_face_surfaces_backend_message() {
    let backend = MockBackend::spawn().await;
    backend.enroll_user("u2", "Bob");
    backend.reject_face("u2");
    let mut dashboard = dashboard(&backend, SyntheticCamera::new());
    dashboard.start_camera(CameraConstraints::default()).await;

    let mut verify = OperationForm::verify().with_user_id("u2");
    let status = dashboard.submit(&mut verify).await;
    assert_eq!(status, StatusState::error("Face mismatch"));
    assert_eq!(verify.user_id, "u2");
}

#[tokio::test]
async fn denied_permission_creates_no_session() {
    let backend = MockBackend::spawn().await;
    let mut dashboard = dashboard(
        &backend,
        SyntheticCamera::new().with_permission(PermissionPolicy::Denied),
    );

    let status = dashboard.start_camera(CameraConstraints::default()).await;
    assert_eq!(status, StatusState::error("Failed to access camera."));
    assert!(!dashboard.is_camera_on());
    assert_eq!(dashboard.camera().metrics().denied, 1);
    assert_eq!(dashboard.camera().backend().live_tracks(), 0);
}

#[tokio::test]
async fn missing_user_id_never_reaches_backend() {
    let backend = MockBackend::spawn().await;
    let mut dashboard = dashboard(&backend, SyntheticCamera::new());
    dashboard.start_camera(CameraConstraints::default()).await;

    let mut enroll = OperationForm::enroll().with_full_name("Alice");
    let status = dashboard.submit(&mut enroll).await;
    assert_eq!(status, StatusState::error("User ID is required."));
    assert!(backend.requests().is_empty());
    assert_eq!(dashboard.capturer().metrics().frames_captured, 0);
    assert_eq!(enroll.full_name, "Alice");
}

#[tokio::test]
async fn repeated_cycles_reuse_the_session() {
    let backend = MockBackend::spawn().await;
    backend.enroll_user("u1", "Alice");
    let mut dashboard = dashboard(&backend, SyntheticCamera::new());
    dashboard.start_camera(CameraConstraints::default()).await;
    let mut events = dashboard.feed().subscribe();

    for round in 0..10 {
        let mut verify = OperationForm::verify().with_user_id("u1");
        let status = dashboard.submit(&mut verify).await;
        assert_eq!(status.kind, StatusKind::Success, "round {round}");
    }

    assert_eq!(backend.requests().len(), 10);
    assert_eq!(dashboard.camera().metrics().acquisitions, 1);
    assert_eq!(dashboard.camera().backend().live_tracks(), 1);
    assert_eq!(dashboard.capturer().metrics().rasters_in_use, 0);

    let first = events.next().await.expect("first event");
    assert_eq!(first.state, FlowState::Capturing);

    dashboard.stop_camera().await;
    assert_eq!(dashboard.camera().backend().live_tracks(), 0);
}

#[tokio::test]
async fn capture_follows_live_resolution() {
    let backend = MockBackend::spawn().await;
    backend.enroll_user("u1", "Alice");
    let mut dashboard = dashboard(&backend, SyntheticCamera::new());
    dashboard.start_camera(CameraConstraints::default()).await;

    let session = dashboard
        .flow(faceauth_types::operation::OperationKind::Verify)
        .expect("camera running")
        .session()
        .clone();
    let capturer = FrameCapturer::jpeg(80);

    let first = capturer.capture(&session).await.expect("capture");
    assert_eq!((first.width, first.height), (1280, 720));

    dashboard.camera().backend().set_resolution(640, 480);
    let second = capturer.capture(&session).await.expect("capture");
    assert_eq!((second.width, second.height), (640, 480));
}

#[tokio::test]
async fn stopped_camera_rejects_submissions() {
    let backend = MockBackend::spawn().await;
    let mut dashboard = dashboard(&backend, SyntheticCamera::new());
    dashboard.start_camera(CameraConstraints::default()).await;
    let stopped = dashboard.stop_camera().await;
    assert_eq!(stopped, StatusState::info("Camera stopped."));

    let mut verify = OperationForm::verify().with_user_id("u1");
    let status = dashboard.submit(&mut verify).await;
    assert_eq!(status, StatusState::error("Camera not ready."));
    assert!(backend.requests().is_empty());
    assert_eq!(dashboard.log().snapshot().await.len(), 3);
}
