use crate::config::CameraConfig;
use crate::error::CameraError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[cfg(all(target_os = "linux", feature = "camera"))]
pub mod gst;
pub mod mock;

/// A stateful capture source. Implementations may be slow, may return
/// no data, and must never be called concurrently; [`FrameSource`]
/// enforces the last part.
#[async_trait]
pub trait CameraDevice: Send {
    /// Configure and power the device. A failure here is fatal to
    /// startup and is not retried.
    async fn initialize(&mut self) -> Result<(), CameraError>;

    /// Capture one encoded frame. Blocking relative to its own task.
    async fn capture_frame(&mut self) -> Result<Bytes, CameraError>;

    /// Release the device.
    async fn shutdown(&mut self);
}

/// Owner of the single camera handle. All capture calls pass through
/// here; a mutex serializes access so concurrent stream sessions
/// observe strictly sequential device calls. No buffering or frame
/// skipping happens at this layer.
pub struct FrameSource {
    device: Mutex<Box<dyn CameraDevice>>,
}

impl FrameSource {
    /// Initialize the device and take ownership of it.
    pub async fn initialize(mut device: Box<dyn CameraDevice>) -> Result<Self, CameraError> {
        device.initialize().await?;
        info!("Camera initialized");
        Ok(Self {
            device: Mutex::new(device),
        })
    }

    /// Capture and discard `frames` frames before the server is
    /// considered ready. Early frames from a freshly powered sensor are
    /// commonly under-exposed. Missing warm-up frames are tolerated; a
    /// dark first real frame is acceptable.
    pub async fn warm_up(&self, frames: u32, spacing: Duration) {
        if frames == 0 {
            return;
        }

        info!("Warming up camera (discarding first {} frames)", frames);
        for i in 0..frames {
            match self.capture_frame().await {
                Ok(frame) => {
                    debug!("Warm-up frame {}: {} bytes - discarded", i + 1, frame.len());
                }
                Err(e) => {
                    warn!("Warm-up frame {} failed: {}", i + 1, e);
                }
            }
            tokio::time::sleep(spacing).await;
        }
        info!("Camera ready for streaming");
    }

    /// Capture one frame. Never returns a zero-length success; an empty
    /// frame from the device is reported as [`CameraError::EmptyFrame`].
    pub async fn capture_frame(&self) -> Result<Bytes, CameraError> {
        let mut device = self.device.lock().await;
        let frame = device.capture_frame().await?;
        if frame.is_empty() {
            return Err(CameraError::EmptyFrame);
        }
        Ok(frame)
    }

    /// Shut the device down. Called once at process exit.
    pub async fn shutdown(&self) {
        self.device.lock().await.shutdown().await;
        info!("Camera shut down");
    }
}

/// Build the camera backend selected by the platform and feature set.
#[cfg(all(target_os = "linux", feature = "camera"))]
pub fn default_device(config: &CameraConfig) -> Box<dyn CameraDevice> {
    Box::new(gst::GstCamera::new(config.clone()))
}

/// Without the GStreamer backend a synthetic test-pattern camera keeps
/// the server exercisable.
#[cfg(not(all(target_os = "linux", feature = "camera")))]
pub fn default_device(config: &CameraConfig) -> Box<dyn CameraDevice> {
    warn!("GStreamer camera backend unavailable; using test-pattern camera");
    Box::new(mock::MockCamera::test_pattern(config.resolution))
}
