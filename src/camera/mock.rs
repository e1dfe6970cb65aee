//! Scriptable camera double.
//!
//! Used by the test suite and as the fallback backend on platforms
//! without GStreamer. The overlap flag records whether two capture
//! calls were ever in flight at the same time, which must never happen
//! behind [`FrameSource`](super::FrameSource).

use crate::error::CameraError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

pub struct MockCamera {
    script: VecDeque<Result<Bytes, CameraError>>,
    pattern_resolution: Option<(u32, u32)>,
    init_error: Option<String>,
    capture_delay: Duration,
    frame_counter: u64,
    in_capture: Arc<AtomicBool>,
    overlap_detected: Arc<AtomicBool>,
    capture_count: Arc<AtomicU64>,
}

impl MockCamera {
    /// A camera that plays back the given capture outcomes in order,
    /// then reports a capture error once the script is exhausted.
    pub fn scripted(script: Vec<Result<Bytes, CameraError>>) -> Self {
        Self {
            script: script.into(),
            pattern_resolution: None,
            init_error: None,
            capture_delay: Duration::ZERO,
            frame_counter: 0,
            in_capture: Arc::new(AtomicBool::new(false)),
            overlap_detected: Arc::new(AtomicBool::new(false)),
            capture_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A camera that produces synthetic JPEG-framed test data forever.
    pub fn test_pattern(resolution: (u32, u32)) -> Self {
        let mut camera = Self::scripted(Vec::new());
        camera.pattern_resolution = Some(resolution);
        camera
    }

    /// A camera whose `initialize` call fails.
    pub fn failing_init<S: Into<String>>(details: S) -> Self {
        let mut camera = Self::scripted(Vec::new());
        camera.init_error = Some(details.into());
        camera
    }

    /// Hold each capture open for `delay`, widening the window in which
    /// an overlapping call would be observed.
    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// Set when two captures ever overlapped.
    pub fn overlap_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.overlap_detected)
    }

    /// Total number of capture calls made against this device.
    pub fn capture_count(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.capture_count)
    }

    fn pattern_frame(&self, resolution: (u32, u32)) -> Bytes {
        // SOI marker, a payload that varies per frame, EOI marker.
        let mut data = vec![0xFF, 0xD8];
        let pattern_len = 1000 + (self.frame_counter % 500) as usize;
        data.extend(std::iter::repeat((self.frame_counter % 256) as u8).take(pattern_len));
        data.extend_from_slice(&[0xFF, 0xD9]);
        trace!(
            "Generated test-pattern frame {} ({}x{}, {} bytes)",
            self.frame_counter,
            resolution.0,
            resolution.1,
            data.len()
        );
        Bytes::from(data)
    }
}

#[async_trait]
impl super::CameraDevice for MockCamera {
    async fn initialize(&mut self) -> Result<(), CameraError> {
        match self.init_error.take() {
            Some(details) => Err(CameraError::init(details)),
            None => Ok(()),
        }
    }

    async fn capture_frame(&mut self) -> Result<Bytes, CameraError> {
        if self.in_capture.swap(true, Ordering::SeqCst) {
            self.overlap_detected.store(true, Ordering::SeqCst);
        }
        self.capture_count.fetch_add(1, Ordering::SeqCst);

        if !self.capture_delay.is_zero() {
            tokio::time::sleep(self.capture_delay).await;
        }

        let result = match self.script.pop_front() {
            Some(outcome) => outcome,
            None => match self.pattern_resolution {
                Some(resolution) => {
                    let frame = self.pattern_frame(resolution);
                    self.frame_counter += 1;
                    Ok(frame)
                }
                None => Err(CameraError::capture("mock script exhausted")),
            },
        };

        self.in_capture.store(false, Ordering::SeqCst);
        result
    }

    async fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::super::CameraDevice;
    use super::*;

    #[tokio::test]
    async fn test_scripted_playback_order() {
        let mut camera = MockCamera::scripted(vec![
            Ok(Bytes::from_static(b"one")),
            Err(CameraError::capture("glitch")),
            Ok(Bytes::from_static(b"two")),
        ]);
        camera.initialize().await.unwrap();

        assert_eq!(camera.capture_frame().await.unwrap(), "one");
        assert!(camera.capture_frame().await.is_err());
        assert_eq!(camera.capture_frame().await.unwrap(), "two");
        // Exhausted script keeps failing rather than hanging.
        assert!(camera.capture_frame().await.is_err());
    }

    #[tokio::test]
    async fn test_pattern_frames_are_jpeg_delimited() {
        let mut camera = MockCamera::test_pattern((320, 240));
        camera.initialize().await.unwrap();

        let frame = camera.capture_frame().await.unwrap();
        assert_eq!(&frame[..2], &[0xFF, 0xD8]);
        assert_eq!(&frame[frame.len() - 2..], &[0xFF, 0xD9]);

        // Successive frames differ.
        let next = camera.capture_frame().await.unwrap();
        assert_ne!(frame, next);
    }
}
