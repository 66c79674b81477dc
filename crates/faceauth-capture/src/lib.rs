//! Still-frame extraction and encoding.

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use faceauth_camera::SessionHandle;
use faceauth_types::{frame::CapturedFrame, FaceAuthError, Result};
use image::{codecs::jpeg::JpegEncoder as JpegCodec, ColorType, RgbImage};
use tracing::{debug, warn};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Turns a rendered raster into encoded image bytes.
#[async_trait]
pub trait FrameEncoder: Send + Sync {
    async fn encode(&self, pixels: RgbImage) -> Result<Vec<u8>>;
}

/// JPEG encoder that runs on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

#[async_trait]
impl FrameEncoder for JpegEncoder {
    async fn encode(&self, pixels: RgbImage) -> Result<Vec<u8>> {
        let quality = self.quality;
        tokio::task::spawn_blocking(move || {
            let (width, height) = pixels.dimensions();
            let mut buffer = Vec::new();
            JpegCodec::new_with_quality(&mut buffer, quality).encode(
                pixels.as_raw(),
                width,
                height,
                ColorType::Rgb8,
            )?;
            Ok::<_, image::ImageError>(buffer)
        })
        .await
        .map_err(|err| capture_error(format!("encoder task failed: {err}")))?
        .map_err(|err| capture_error(format!("jpeg encoding failed: {err}")))
    }
}

/// Off-screen raster owned by exactly one capture call.
pub struct RasterTarget {
    image: RgbImage,
    _lease: RasterLease,
}

impl RasterTarget {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.image
    }
}

struct RasterLease(Arc<AtomicUsize>);

impl Drop for RasterLease {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CaptureMetrics {
    pub frames_captured: u64,
    pub encode_failures: u64,
    pub rasters_in_use: usize,
}

#[derive(Default)]
struct MetricsInner {
    frames_captured: AtomicU64,
    encode_failures: AtomicU64,
    rasters_in_use: Arc<AtomicUsize>,
}

pub struct FrameCapturer<E: FrameEncoder = JpegEncoder> {
    encoder: E,
    metrics: MetricsInner,
}

impl FrameCapturer<JpegEncoder> {
    pub fn jpeg(quality: u8) -> Self {
        Self::new(JpegEncoder::new(quality))
    }
}

impl<E: FrameEncoder> FrameCapturer<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            metrics: MetricsInner::default(),
        }
    }

    /// Grabs the current frame and encodes it.
    pub async fn capture(&self, session: &SessionHandle) -> Result<CapturedFrame> {
        let raster = self.grab(session)?;
        self.encode(raster).await
    }

    /// Draws the frame currently on screen into a fresh raster sized to the
    /// stream's resolution at this instant.
    pub fn grab(&self, session: &SessionHandle) -> Result<RasterTarget> {
        let stream = session.stream()?;
        let (width, height) = stream.resolution();
        if width == 0 || height == 0 {
            return Err(capture_error("video source has no frame yet"));
        }

        let mut raster = self.allocate(width, height);
        stream.draw_into(&mut raster.image).map_err(|err| {
            if session.is_open() {
                capture_error(format!("frame draw failed: {err}"))
            } else {
                FaceAuthError::SessionClosed
            }
        })?;
        debug!("Grabbed {}x{} frame from session {}", width, height, session.id());
        Ok(raster)
    }

    pub async fn encode(&self, raster: RasterTarget) -> Result<CapturedFrame> {
        let RasterTarget { image, _lease } = raster;
        let (width, height) = image.dimensions();
        let encoded = self.encoder.encode(image).await;
        drop(_lease);

        let payload = match encoded {
            Ok(payload) if !payload.is_empty() => payload,
            Ok(_) => {
                self.metrics.encode_failures.fetch_add(1, Ordering::SeqCst);
                return Err(capture_error("encode failed"));
            }
            Err(err) => {
                warn!("Frame encoder error: {}", err);
                self.metrics.encode_failures.fetch_add(1, Ordering::SeqCst);
                return Err(err);
            }
        };

        let frame = CapturedFrame::jpeg(width, height, payload)?;
        self.metrics.frames_captured.fetch_add(1, Ordering::SeqCst);
        Ok(frame)
    }

    pub fn metrics(&self) -> CaptureMetrics {
        CaptureMetrics {
            frames_captured: self.metrics.frames_captured.load(Ordering::SeqCst),
            encode_failures: self.metrics.encode_failures.load(Ordering::SeqCst),
            rasters_in_use: self.metrics.rasters_in_use.load(Ordering::SeqCst),
        }
    }

    fn allocate(&self, width: u32, height: u32) -> RasterTarget {
        self.metrics.rasters_in_use.fetch_add(1, Ordering::SeqCst);
        RasterTarget {
            image: RgbImage::new(width, height),
            _lease: RasterLease(Arc::clone(&self.metrics.rasters_in_use)),
        }
    }
}

pub fn capture_error(message: impl Into<String>) -> FaceAuthError {
    FaceAuthError::Capture(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceauth_camera::{CameraConstraints, CameraController, CameraSession, SyntheticCamera};
    use image::ImageFormat;

    async fn open_session(
        camera: SyntheticCamera,
    ) -> (CameraController<SyntheticCamera>, CameraSession) {
        let controller = CameraController::new(camera);
        let session = controller
            .acquire(CameraConstraints::default())
            .await
            .expect("acquire");
        (controller, session)
    }

    struct EmptyEncoder;

    #[async_trait]
    impl FrameEncoder for EmptyEncoder {
        async fn encode(&self, _pixels: RgbImage) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    /// Yields before returning so concurrent captures interleave.
    struct SlowEncoder;

    #[async_trait]
    impl FrameEncoder for SlowEncoder {
        async fn encode(&self, pixels: RgbImage) -> Result<Vec<u8>> {
            tokio::task::yield_now().await;
            JpegEncoder::default().encode(pixels).await
        }
    }

    #[tokio::test]
    async fn capture_matches_live_resolution_at_each_call() {
        let (controller, session) = open_session(SyntheticCamera::new()).await;
        let capturer = FrameCapturer::jpeg(80);
        let handle = session.handle();

        for (width, height) in [(640, 480), (320, 240), (1280, 720)] {
            controller.backend().set_resolution(width, height);
            let frame = capturer.capture(&handle).await.expect("capture");
            assert_eq!((frame.width, frame.height), (width, height));

            let decoded = image::load_from_memory_with_format(&frame.payload, ImageFormat::Jpeg)
                .expect("decode jpeg");
            assert_eq!((decoded.width(), decoded.height()), (width, height));
        }
        assert_eq!(capturer.metrics().frames_captured, 3);
        assert_eq!(capturer.metrics().rasters_in_use, 0);
    }

    #[tokio::test]
    async fn capture_requires_an_open_session() {
        let (controller, mut session) = open_session(SyntheticCamera::new()).await;
        let handle = session.handle();
        controller.release(&mut session);

        let capturer = FrameCapturer::jpeg(DEFAULT_JPEG_QUALITY);
        let err = capturer.capture(&handle).await.expect_err("closed");
        assert!(matches!(err, FaceAuthError::Capture(msg) if msg == "session not active"));
        assert_eq!(capturer.metrics().rasters_in_use, 0);
    }

    #[tokio::test]
    async fn empty_encoder_output_is_an_encode_failure() {
        let (_controller, session) = open_session(SyntheticCamera::new()).await;
        let capturer = FrameCapturer::new(EmptyEncoder);

        let err = capturer
            .capture(&session.handle())
            .await
            .expect_err("empty payload");
        assert!(matches!(err, FaceAuthError::Capture(msg) if msg == "encode failed"));
        let metrics = capturer.metrics();
        assert_eq!(metrics.encode_failures, 1);
        assert_eq!(metrics.rasters_in_use, 0);
    }

    #[tokio::test]
    async fn concurrent_captures_use_private_rasters() {
        let (controller, session) = open_session(SyntheticCamera::new()).await;
        let capturer = FrameCapturer::new(SlowEncoder);
        let handle = session.handle();

        controller.backend().set_resolution(320, 240);
        let first = capturer.grab(&handle).expect("first grab");
        controller.backend().set_resolution(160, 120);
        let second = capturer.grab(&handle).expect("second grab");
        assert_eq!(capturer.metrics().rasters_in_use, 2);

        let (a, b) = tokio::join!(capturer.encode(first), capturer.encode(second));
        let (a, b) = (a.expect("first frame"), b.expect("second frame"));
        assert_eq!((a.width, a.height), (320, 240));
        assert_eq!((b.width, b.height), (160, 120));
        assert_eq!(capturer.metrics().rasters_in_use, 0);
    }
}
