use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc, RwLock,
};

use async_trait::async_trait;
use faceauth_types::Result;
use image::{Rgb, RgbImage};
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::{camera_error, CameraBackend, CameraConstraints, VideoStream};

/// How the simulated permission prompt is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionPolicy {
    Granted,
    Denied,
}

/// Camera that renders a generated test pattern. Resolution can be changed
/// while streams are live to simulate a device renegotiating its mode.
pub struct SyntheticCamera {
    permission: PermissionPolicy,
    device_present: bool,
    prompt_delay: Duration,
    resolution: Arc<RwLock<(u32, u32)>>,
    live_tracks: Arc<AtomicUsize>,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self {
            permission: PermissionPolicy::Granted,
            device_present: true,
            prompt_delay: Duration::from_millis(0),
            resolution: Arc::new(RwLock::new((0, 0))),
            live_tracks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_permission(mut self, permission: PermissionPolicy) -> Self {
        self.permission = permission;
        self
    }

    pub fn without_device(mut self) -> Self {
        self.device_present = false;
        self
    }

    pub fn with_prompt_delay(mut self, delay: Duration) -> Self {
        self.prompt_delay = delay;
        self
    }

    /// Changes the native resolution of every live stream.
    pub fn set_resolution(&self, width: u32, height: u32) {
        if let Ok(mut guard) = self.resolution.write() {
            *guard = (width, height);
        }
    }

    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraBackend for SyntheticCamera {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn open(&self, constraints: &CameraConstraints) -> Result<Arc<dyn VideoStream>> {
        if !self.prompt_delay.is_zero() {
            sleep(self.prompt_delay).await;
        }
        if self.permission == PermissionPolicy::Denied {
            return Err(camera_error("permission denied"));
        }
        if !self.device_present {
            return Err(camera_error("no camera matches the requested constraints"));
        }

        self.set_resolution(constraints.ideal_width, constraints.ideal_height);
        self.live_tracks.fetch_add(1, Ordering::SeqCst);
        info!(
            "Synthetic camera streaming at {}x{}",
            constraints.ideal_width, constraints.ideal_height
        );
        Ok(Arc::new(SyntheticStream {
            resolution: Arc::clone(&self.resolution),
            live_tracks: Arc::clone(&self.live_tracks),
            stopped: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        }))
    }
}

struct SyntheticStream {
    resolution: Arc<RwLock<(u32, u32)>>,
    live_tracks: Arc<AtomicUsize>,
    stopped: AtomicBool,
    sequence: AtomicU64,
}

impl VideoStream for SyntheticStream {
    fn resolution(&self) -> (u32, u32) {
        self.resolution.read().map(|r| *r).unwrap_or((0, 0))
    }

    fn draw_into(&self, target: &mut RgbImage) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(camera_error("track stopped"));
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let (width, height) = target.dimensions();
        let shade = (sequence % 256) as u8;
        for (x, y, pixel) in target.enumerate_pixels_mut() {
            let r = (x as u64 * 255 / width.max(1) as u64) as u8;
            let g = (y as u64 * 255 / height.max(1) as u64) as u8;
            *pixel = Rgb([r, g, shade]);
        }
        Ok(())
    }

    fn stop_tracks(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.live_tracks.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn live_tracks(&self) -> usize {
        usize::from(!self.stopped.load(Ordering::SeqCst))
    }
}
