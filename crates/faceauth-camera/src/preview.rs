//! Periodic redraw of the live stream into a display raster.

use image::RgbImage;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::SessionHandle;

/// Shortest redraw period. `interval` rejects a zero period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
    pub sequence: u64,
}

/// Owns the preview task. Cancelling or dropping the handle aborts it.
pub struct PreviewHandle {
    task: JoinHandle<()>,
    frames: watch::Receiver<Option<PreviewFrame>>,
}

impl PreviewHandle {
    pub fn latest(&self) -> Option<PreviewFrame> {
        *self.frames.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PreviewFrame>> {
        self.frames.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel(self) {
        // Drop aborts the task.
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Starts redrawing `session` every `period` until cancelled or the session closes.
pub fn spawn_preview(session: SessionHandle, period: Duration) -> PreviewHandle {
    let (tx, rx) = watch::channel(None);
    let task = tokio::spawn(async move {
        let mut ticker = interval(period.max(MIN_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut display: Option<RgbImage> = None;
        let mut sequence = 0u64;

        loop {
            ticker.tick().await;
            let stream = match session.stream() {
                Ok(stream) => stream,
                Err(_) => {
                    debug!("Preview stopping: session {} closed", session.id());
                    break;
                }
            };
            let (width, height) = stream.resolution();
            if width == 0 || height == 0 {
                continue;
            }
            if display.as_ref().map(RgbImage::dimensions) != Some((width, height)) {
                display = Some(RgbImage::new(width, height));
            }
            let Some(target) = display.as_mut() else {
                continue;
            };
            if let Err(err) = stream.draw_into(target) {
                warn!("Preview redraw failed: {}", err);
                continue;
            }
            sequence += 1;
            if tx
                .send(Some(PreviewFrame {
                    width,
                    height,
                    sequence,
                }))
                .is_err()
            {
                break;
            }
        }
    });

    PreviewHandle { task, frames: rx }
}
