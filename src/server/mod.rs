//! TCP accept loop and connection dispatch.
//!
//! One tokio task per accepted connection, unbounded. The accept loop
//! never awaits a handler and never terminates on a per-iteration
//! accept error.

pub mod connection;
pub mod session;

#[cfg(test)]
mod tests;

use crate::camera::FrameSource;
use crate::config::CamstreamConfig;
use crate::error::{Result, ServerError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{info, warn};

pub use session::{SessionSummary, StreamSession};

/// Per-session parameters derived from configuration at startup.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub boundary: String,
    pub capture_backoff: Duration,
    pub report_interval: Duration,
}

impl StreamSettings {
    pub fn from_config(config: &CamstreamConfig) -> Self {
        Self {
            boundary: config.stream.boundary.clone(),
            capture_backoff: config.stream.capture_backoff(),
            report_interval: config.stream.report_interval(),
        }
    }
}

/// MJPEG streaming server over a hand-rolled HTTP surface.
pub struct StreamServer {
    listener: TcpListener,
    source: Arc<FrameSource>,
    settings: Arc<StreamSettings>,
    client_counter: AtomicU64,
}

impl StreamServer {
    /// Bind the listening socket. A bind failure is fatal to startup.
    pub async fn bind(config: &CamstreamConfig, source: Arc<FrameSource>) -> Result<Self> {
        let address = format!("{}:{}", config.server.ip, config.server.port);
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::BindFailed {
                address: address.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
            })?;

        let bind_err = |e: std::io::Error| ServerError::BindFailed {
            address: address.clone(),
            source: e,
        };

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(bind_err)?;

        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let listener = socket.listen(config.server.backlog).map_err(bind_err)?;

        info!("MJPEG server listening on {}", address);

        Ok(Self {
            listener,
            source,
            settings: Arc::new(StreamSettings::from_config(config)),
            client_counter: AtomicU64::new(0),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, spawning one handler task each. A
    /// failed accept is logged and the loop continues.
    pub async fn serve(self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer)) => {
                    let client_id = self.client_counter.fetch_add(1, Ordering::Relaxed) + 1;
                    info!("[Client {}] Connected from {}", client_id, peer);

                    let source = Arc::clone(&self.source);
                    let settings = Arc::clone(&self.settings);
                    tokio::spawn(async move {
                        connection::handle_connection(socket, client_id, source, settings).await;
                        info!("[Client {}] Disconnected", client_id);
                    });
                }
                Err(e) => {
                    warn!("Error accepting client: {}", e);
                }
            }
        }
    }
}
