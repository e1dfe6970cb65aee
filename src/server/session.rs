//! Per-client MJPEG stream session.
//!
//! A session owns the socket for its lifetime and loops: capture a
//! frame, encode it as one multipart part, write it, flush. A failed
//! or empty capture is transient and retried after a short backoff; a
//! transport-level write failure is the sole termination path.

use super::StreamSettings;
use crate::camera::FrameSource;
use crate::http;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Final accounting for a terminated session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub frames_sent: u64,
    pub elapsed: Duration,
    pub average_fps: f64,
}

pub struct StreamSession<W> {
    writer: W,
    client_id: u64,
    frames_sent: u64,
}

impl<W: AsyncWrite + Unpin> StreamSession<W> {
    pub fn new(writer: W, client_id: u64) -> Self {
        Self {
            writer,
            client_id,
            frames_sent: 0,
        }
    }

    /// Stream frames until the peer disconnects. Capture errors never
    /// terminate the session and are never surfaced to the client; the
    /// MJPEG protocol has no way to report them once headers are sent.
    pub async fn run(mut self, source: &FrameSource, settings: &StreamSettings) -> SessionSummary {
        let started = Instant::now();
        let mut last_report = started;

        if let Err(e) = self
            .write_all_flush(&http::stream_preamble(&settings.boundary))
            .await
        {
            debug!("[Client {}] Failed to write preamble: {}", self.client_id, e);
            return self.summary(started);
        }

        info!("[Client {}] Streaming started", self.client_id);

        loop {
            let frame = match source.capture_frame().await {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("[Client {}] {}, retrying", self.client_id, e);
                    tokio::time::sleep(settings.capture_backoff).await;
                    continue;
                }
            };

            let part = http::encode_part(&settings.boundary, &frame);
            if let Err(e) = self.write_all_flush(&part).await {
                info!("[Client {}] Client disconnected ({})", self.client_id, e);
                break;
            }
            self.frames_sent += 1;

            if last_report.elapsed() >= settings.report_interval {
                info!(
                    "[Client {}] Frames: {}, FPS: {:.1}, Size: {} bytes",
                    self.client_id,
                    self.frames_sent,
                    frame_rate(self.frames_sent, started.elapsed()),
                    frame.len()
                );
                last_report = Instant::now();
            }
        }

        let summary = self.summary(started);
        info!(
            "[Client {}] Stream ended. Total frames: {}, Avg FPS: {:.1}",
            self.client_id, summary.frames_sent, summary.average_fps
        );
        summary
    }

    async fn write_all_flush(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    fn summary(&self, started: Instant) -> SessionSummary {
        let elapsed = started.elapsed();
        SessionSummary {
            frames_sent: self.frames_sent,
            elapsed,
            average_fps: frame_rate(self.frames_sent, elapsed),
        }
    }
}

/// Frames per second over the elapsed wall time. Purely observational;
/// has no effect on flow control.
pub(crate) fn frame_rate(frames_sent: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        frames_sent as f64 / secs
    } else {
        0.0
    }
}
