pub mod camera;
pub mod config;
pub mod error;
pub mod http;
pub mod server;

pub use camera::{CameraDevice, FrameSource};
pub use config::CamstreamConfig;
pub use error::{CameraError, CamstreamError, Result, ServerError};
pub use server::{SessionSummary, StreamServer, StreamSession, StreamSettings};
