//! Per-connection request classification.
//!
//! The request is read once into a fixed buffer and substring-matched.
//! A request split across reads is treated as a short request and
//! classified best-effort from whatever bytes arrived; no other HTTP
//! feature (headers, keep-alive, chunking) is exercised by this server.

use super::session::StreamSession;
use super::StreamSettings;
use crate::camera::FrameSource;
use crate::http;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Upper bound on the single request read.
pub const REQUEST_BUFFER_SIZE: usize = 512;

/// Literal marker identifying a stream request.
const STREAM_REQUEST_MARKER: &str = "GET /stream";

/// Drive one connection to completion. The socket is owned by this
/// call for its entire lifetime and released on every exit path.
pub async fn handle_connection<S>(
    mut socket: S,
    client_id: u64,
    source: Arc<FrameSource>,
    settings: Arc<StreamSettings>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = [0u8; REQUEST_BUFFER_SIZE];
    let bytes_read = match socket.read(&mut buffer).await {
        Ok(n) => n,
        Err(e) => {
            warn!("[Client {}] Failed to read request: {}", client_id, e);
            return;
        }
    };

    let request = String::from_utf8_lossy(&buffer[..bytes_read]);
    let preview: String = request.chars().take(50).collect();
    debug!("[Client {}] Request: {}...", client_id, preview);

    if request.contains(STREAM_REQUEST_MARKER) {
        StreamSession::new(socket, client_id)
            .run(&source, &settings)
            .await;
    } else {
        send_viewer_page(socket, client_id).await;
    }
}

async fn send_viewer_page<S>(mut socket: S, client_id: u64)
where
    S: AsyncWrite + Unpin,
{
    debug!("[Client {}] Sending HTML viewer page", client_id);
    let response = http::viewer_page_response();
    if let Err(e) = socket.write_all(&response).await {
        debug!("[Client {}] Failed to send viewer page: {}", client_id, e);
        return;
    }
    let _ = socket.flush().await;
}
