//! Scripted collaborators for flow tests.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use faceauth_camera::CameraSession;
use faceauth_capture::{FrameEncoder, JpegEncoder};
use faceauth_client::SubmissionClient;
use faceauth_types::{
    operation::{EnrollmentRequest, OperationKind, OperationResult, VerificationRequest},
    FaceAuthError, Result,
};
use image::RgbImage;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct Call {
    pub kind: OperationKind,
    pub user_id: String,
    pub full_name: Option<String>,
    pub dimensions: (u32, u32),
}

/// Submission client answering like the backend without any I/O.
#[derive(Default)]
pub struct ScriptedClient {
    calls: Mutex<Vec<Call>>,
    rejected: Mutex<HashSet<String>>,
    offline: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    close_on_submit: Option<Arc<Mutex<Option<CameraSession>>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the camera owner as soon as a submission arrives.
    pub fn closing_on_submit(mut self, owner: Arc<Mutex<Option<CameraSession>>>) -> Self {
        self.close_on_submit = Some(owner);
        self
    }

    pub fn reject_face(&self, user_id: &str) {
        if let Ok(mut guard) = self.rejected.lock() {
            guard.insert(user_id.to_string());
        }
    }

    pub fn accept_face(&self, user_id: &str) {
        if let Ok(mut guard) = self.rejected.lock() {
            guard.remove(user_id);
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Submissions wait until the returned gate is notified.
    pub fn hold_submissions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        if let Ok(mut guard) = self.gate.lock() {
            *guard = Some(Arc::clone(&gate));
        }
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    async fn arrive(&self, call: Call) -> Result<()> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call);
        }
        if let Some(owner) = &self.close_on_submit {
            let session = owner.lock().ok().and_then(|mut slot| slot.take());
            drop(session);
        }
        let gate = self.gate.lock().ok().and_then(|g| g.clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(FaceAuthError::Network(
                "Unable to reach the face authentication service.".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SubmissionClient for ScriptedClient {
    async fn enroll(&self, request: EnrollmentRequest) -> Result<OperationResult> {
        self.arrive(Call {
            kind: OperationKind::Enroll,
            user_id: request.user_id.clone(),
            full_name: Some(request.full_name.clone()),
            dimensions: (request.frame.width, request.frame.height),
        })
        .await?;
        Ok(OperationResult::success(
            format!("Enrolled {}", request.user_id),
            200,
        ))
    }

    async fn verify(&self, request: VerificationRequest) -> Result<OperationResult> {
        self.arrive(Call {
            kind: OperationKind::Verify,
            user_id: request.user_id.clone(),
            full_name: None,
            dimensions: (request.frame.width, request.frame.height),
        })
        .await?;
        let rejected = self
            .rejected
            .lock()
            .map(|r| r.contains(&request.user_id))
            .unwrap_or(false);
        if rejected {
            Err(FaceAuthError::Api {
                status: 401,
                message: "Face mismatch".into(),
            })
        } else {
            Ok(OperationResult::success("Face verified", 200))
        }
    }
}

/// Encoder that tears the camera down while the frame is being encoded.
pub struct ClosingEncoder {
    owner: Arc<Mutex<Option<CameraSession>>>,
}

impl ClosingEncoder {
    pub fn new(owner: Arc<Mutex<Option<CameraSession>>>) -> Self {
        Self { owner }
    }
}

#[async_trait]
impl FrameEncoder for ClosingEncoder {
    async fn encode(&self, pixels: RgbImage) -> Result<Vec<u8>> {
        let session = self.owner.lock().ok().and_then(|mut slot| slot.take());
        drop(session);
        JpegEncoder::default().encode(pixels).await
    }
}

/// Encoder that reports success with no bytes.
pub struct EmptyEncoder;

#[async_trait]
impl FrameEncoder for EmptyEncoder {
    async fn encode(&self, _pixels: RgbImage) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}
