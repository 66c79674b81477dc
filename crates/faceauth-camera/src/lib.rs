//! Camera acquisition and session ownership.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use faceauth_types::{
    config::{CameraConfig, FacingMode},
    FaceAuthError, Result,
};
use image::RgbImage;
use tracing::{info, warn};
use uuid::Uuid;

pub mod preview;
mod still;
mod synthetic;

pub use preview::{spawn_preview, PreviewFrame, PreviewHandle};
pub use still::StillImageCamera;
pub use synthetic::{PermissionPolicy, SyntheticCamera};

/// Resolution and facing preferences passed to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            facing: FacingMode::User,
        }
    }
}

impl From<&CameraConfig> for CameraConstraints {
    fn from(config: &CameraConfig) -> Self {
        Self {
            ideal_width: config.ideal_width,
            ideal_height: config.ideal_height,
            facing: config.facing,
        }
    }
}

/// A live stream opened by a [`CameraBackend`].
pub trait VideoStream: Send + Sync {
    /// Native resolution of the stream right now.
    fn resolution(&self) -> (u32, u32);

    /// Renders the currently displayed frame into `target`, scaled to its size.
    fn draw_into(&self, target: &mut RgbImage) -> Result<()>;

    /// Stops every underlying device track.
    fn stop_tracks(&self);

    fn live_tracks(&self) -> usize;
}

#[async_trait]
pub trait CameraBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Opens the device. May suspend while the user answers a permission prompt.
    async fn open(&self, constraints: &CameraConstraints) -> Result<Arc<dyn VideoStream>>;
}

struct SessionInner {
    id: Uuid,
    open: AtomicBool,
    stream: Arc<dyn VideoStream>,
    opened_at: DateTime<Utc>,
}

impl SessionInner {
    fn close(&self) -> bool {
        if self.open.swap(false, Ordering::SeqCst) {
            self.stream.stop_tracks();
            true
        } else {
            false
        }
    }
}

/// Read-only view of a session shared with every flow that captures from it.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.inner.opened_at
    }

    /// The live stream, or `CaptureError("session not active")` once closed.
    pub fn stream(&self) -> Result<&Arc<dyn VideoStream>> {
        if self.is_open() {
            Ok(&self.inner.stream)
        } else {
            Err(camera_error_inactive())
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.inner.id)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Owned camera session. Only the owner can close it; dropping it closes it.
#[derive(Debug)]
pub struct CameraSession {
    handle: SessionHandle,
}

impl CameraSession {
    fn new(stream: Arc<dyn VideoStream>) -> Self {
        Self {
            handle: SessionHandle {
                inner: Arc::new(SessionInner {
                    id: Uuid::new_v4(),
                    open: AtomicBool::new(true),
                    stream,
                    opened_at: Utc::now(),
                }),
            },
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    pub fn id(&self) -> Uuid {
        self.handle.id()
    }

    /// Closes the session. Returns `false` when it was already closed.
    pub fn close(&mut self) -> bool {
        self.handle.inner.close()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if self.handle.inner.close() {
            info!("Camera session {} released on teardown", self.handle.id());
        }
    }
}

/// Acquisition counters, mainly for leak checks.
#[derive(Debug, Default, Clone)]
pub struct CameraMetrics {
    pub acquisitions: u64,
    pub releases: u64,
    pub denied: u64,
}

pub struct CameraController<B: CameraBackend> {
    backend: B,
    metrics: Arc<Mutex<CameraMetrics>>,
}

impl<B: CameraBackend> CameraController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            metrics: Arc::new(Mutex::new(CameraMetrics::default())),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn acquire(&self, constraints: CameraConstraints) -> Result<CameraSession> {
        info!(
            "Requesting camera from {} ({}x{}, {:?})",
            self.backend.name(),
            constraints.ideal_width,
            constraints.ideal_height,
            constraints.facing
        );
        match self.backend.open(&constraints).await {
            Ok(stream) => {
                let session = CameraSession::new(stream);
                let (width, height) = session.handle.inner.stream.resolution();
                info!(
                    "Camera session {} open at {}x{}",
                    session.id(),
                    width,
                    height
                );
                if let Ok(mut guard) = self.metrics.lock() {
                    guard.acquisitions += 1;
                }
                Ok(session)
            }
            Err(err) => {
                warn!("Camera acquisition failed: {}", err);
                if let Ok(mut guard) = self.metrics.lock() {
                    guard.denied += 1;
                }
                Err(match err {
                    FaceAuthError::Device(_) => err,
                    other => camera_error(other.to_string()),
                })
            }
        }
    }

    /// Stops all device tracks. Releasing a closed session is a no-op.
    pub fn release(&self, session: &mut CameraSession) {
        if session.close() {
            info!("Camera session {} released", session.id());
            if let Ok(mut guard) = self.metrics.lock() {
                guard.releases += 1;
            }
        }
    }

    pub fn metrics(&self) -> CameraMetrics {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

/// Generate an error aligned with camera semantics.
pub fn camera_error(message: impl Into<String>) -> FaceAuthError {
    FaceAuthError::Device(message.into())
}

fn camera_error_inactive() -> FaceAuthError {
    FaceAuthError::Capture("session not active".into())
}
