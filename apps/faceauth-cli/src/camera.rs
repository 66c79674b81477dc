use std::sync::Arc;

use async_trait::async_trait;
use faceauth_camera::{
    CameraBackend, CameraConstraints, StillImageCamera, SyntheticCamera, VideoStream,
};
use faceauth_types::{config::CameraSource, Result};

/// Camera chosen by `camera.source` in the config file.
pub enum ConfiguredCamera {
    Synthetic(SyntheticCamera),
    StillImage(StillImageCamera),
}

impl ConfiguredCamera {
    pub fn from_source(source: &CameraSource) -> Self {
        match source {
            CameraSource::Synthetic => Self::Synthetic(SyntheticCamera::new()),
            CameraSource::StillImage { path } => Self::StillImage(StillImageCamera::new(path)),
        }
    }
}

#[async_trait]
impl CameraBackend for ConfiguredCamera {
    fn name(&self) -> &str {
        match self {
            Self::Synthetic(camera) => camera.name(),
            Self::StillImage(camera) => camera.name(),
        }
    }

    async fn open(&self, constraints: &CameraConstraints) -> Result<Arc<dyn VideoStream>> {
        match self {
            Self::Synthetic(camera) => camera.open(constraints).await,
            Self::StillImage(camera) => camera.open(constraints).await,
        }
    }
}
