//! Camera backed by a still image on local disk.
//!
//! Stands in for a webcam on machines without one: every frame is the same
//! picture at the image's native resolution. Requested constraints are ignored
//! the way a fixed-mode device ignores them.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use faceauth_types::Result;
use image::{imageops::FilterType, RgbImage};
use tracing::info;

use crate::{camera_error, CameraBackend, CameraConstraints, VideoStream};

pub struct StillImageCamera {
    path: PathBuf,
    live_tracks: Arc<AtomicUsize>,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            live_tracks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraBackend for StillImageCamera {
    fn name(&self) -> &str {
        "still-image"
    }

    async fn open(&self, _constraints: &CameraConstraints) -> Result<Arc<dyn VideoStream>> {
        let path = self.path.clone();
        let image = tokio::task::spawn_blocking(move || image::open(&path))
            .await
            .map_err(|err| camera_error(format!("image loader task failed: {err}")))?
            .map_err(|err| {
                camera_error(format!(
                    "no usable image at {}: {err}",
                    self.path.display()
                ))
            })?
            .to_rgb8();

        if image.width() == 0 || image.height() == 0 {
            return Err(camera_error(format!(
                "image at {} has no pixels",
                self.path.display()
            )));
        }

        info!(
            "Still image camera serving {} ({}x{})",
            self.path.display(),
            image.width(),
            image.height()
        );
        self.live_tracks.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StillStream {
            image,
            live_tracks: Arc::clone(&self.live_tracks),
            stopped: AtomicBool::new(false),
        }))
    }
}

struct StillStream {
    image: RgbImage,
    live_tracks: Arc<AtomicUsize>,
    stopped: AtomicBool,
}

impl VideoStream for StillStream {
    fn resolution(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn draw_into(&self, target: &mut RgbImage) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(camera_error("track stopped"));
        }
        if target.dimensions() == self.image.dimensions() {
            target.copy_from_slice(self.image.as_raw());
        } else {
            let (width, height) = target.dimensions();
            *target = image::imageops::resize(&self.image, width, height, FilterType::Triangle);
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
