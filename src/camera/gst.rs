//! GStreamer-backed camera device.
//!
//! Captures hardware-encoded JPEG frames from a v4l2 device through an
//! appsink, one sample per capture call. The pipeline queue is kept at
//! a single buffer so a pulled sample is always the freshest frame.

use crate::config::CameraConfig;
use crate::error::CameraError;
use async_trait::async_trait;
use bytes::Bytes;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use tracing::{debug, info};

/// How long a single sample pull may block before it is reported as a
/// failed capture.
const SAMPLE_TIMEOUT: gstreamer::ClockTime = gstreamer::ClockTime::from_seconds(2);

pub struct GstCamera {
    config: CameraConfig,
    pipeline: Option<Pipeline>,
    appsink: Option<AppSink>,
}

impl GstCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            pipeline: None,
            appsink: None,
        }
    }

    fn pipeline_description(&self) -> String {
        let (width, height) = self.config.resolution;
        format!(
            "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true ! \
             image/jpeg,width={},height={},framerate={}/1 ! \
             queue max-size-buffers=1 leaky=downstream ! \
             appsink name=sink sync=false max-buffers=1 drop=true",
            self.config.index, width, height, self.config.fps
        )
    }
}

#[async_trait]
impl super::CameraDevice for GstCamera {
    async fn initialize(&mut self) -> Result<(), CameraError> {
        gstreamer::init().map_err(|e| CameraError::init(format!("GStreamer init: {e}")))?;

        let description = self.pipeline_description();
        info!("Creating GStreamer pipeline: {}", description);

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| CameraError::init(format!("Failed to create pipeline: {e}")))?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::init("Failed to downcast to Pipeline"))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::init("Pipeline has no appsink"))?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::init("Failed to downcast to AppSink"))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CameraError::init(format!("Failed to start pipeline: {e}")))?;

        self.pipeline = Some(pipeline);
        self.appsink = Some(appsink);
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<Bytes, CameraError> {
        let appsink = self
            .appsink
            .as_ref()
            .ok_or_else(|| CameraError::capture("Camera not initialized"))?;

        // The pull blocks this thread, not the runtime.
        let sample = tokio::task::block_in_place(|| appsink.try_pull_sample(SAMPLE_TIMEOUT))
            .ok_or_else(|| CameraError::capture("No sample within timeout"))?;

        let buffer = sample
            .buffer()
            .ok_or_else(|| CameraError::capture("No buffer in sample"))?;
        let map = buffer
            .map_readable()
            .map_err(|e| CameraError::capture(format!("Failed to map buffer: {e}")))?;

        debug!("Captured JPEG frame ({} bytes)", map.len());
        Ok(Bytes::copy_from_slice(map.as_slice()))
    }

    async fn shutdown(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.set_state(gstreamer::State::Null);
        }
        self.appsink = None;
    }
}
