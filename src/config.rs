use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CamstreamConfig {
    pub server: ServerConfig,
    pub camera: CameraConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind to
    #[serde(default = "default_server_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Listen backlog for pending connections
    #[serde(default = "default_server_backlog")]
    pub backlog: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second requested from the device
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Number of frames captured and discarded before serving traffic
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,

    /// Delay between warm-up captures in milliseconds
    #[serde(default = "default_warmup_interval_ms")]
    pub warmup_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamConfig {
    /// Multipart boundary token
    #[serde(default = "default_stream_boundary")]
    pub boundary: String,

    /// Backoff after a failed or empty capture, in milliseconds
    #[serde(default = "default_capture_backoff_ms")]
    pub capture_backoff_ms: u64,

    /// Interval between per-session FPS reports, in seconds
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
}

impl CameraConfig {
    pub fn warmup_interval(&self) -> Duration {
        Duration::from_millis(self.warmup_interval_ms)
    }
}

impl StreamConfig {
    pub fn capture_backoff(&self) -> Duration {
        Duration::from_millis(self.capture_backoff_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

impl CamstreamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("camstream.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default("server.ip", default_server_ip())?
            .set_default("server.port", default_server_port())?
            .set_default("server.backlog", default_server_backlog())?
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.warmup_frames", default_warmup_frames())?
            .set_default("camera.warmup_interval_ms", default_warmup_interval_ms())?
            .set_default("stream.boundary", default_stream_boundary())?
            .set_default("stream.capture_backoff_ms", default_capture_backoff_ms())?
            .set_default(
                "stream.report_interval_secs",
                default_report_interval_secs(),
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with CAMSTREAM_ prefix
            .add_source(Environment::with_prefix("CAMSTREAM").separator("_"))
            .build()?;

        let config: CamstreamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.server.backlog == 0 {
            return Err(ConfigError::Message(
                "Server backlog must be greater than 0".to_string(),
            ));
        }

        // The boundary is written verbatim into HTTP headers and part
        // delimiters, so it has to be a plain token.
        if self.stream.boundary.is_empty()
            || !self
                .stream
                .boundary
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::Message(
                "Stream boundary must be a non-empty alphanumeric token".to_string(),
            ));
        }

        if self.stream.report_interval_secs == 0 {
            return Err(ConfigError::Message(
                "Stream report interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CamstreamConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                ip: default_server_ip(),
                port: default_server_port(),
                backlog: default_server_backlog(),
            },
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                warmup_frames: default_warmup_frames(),
                warmup_interval_ms: default_warmup_interval_ms(),
            },
            stream: StreamConfig {
                boundary: default_stream_boundary(),
                capture_backoff_ms: default_capture_backoff_ms(),
                report_interval_secs: default_report_interval_secs(),
            },
        }
    }
}

// Default value functions
fn default_server_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_server_port() -> u16 {
    8080
}
fn default_server_backlog() -> u32 {
    5
}

fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_warmup_frames() -> u32 {
    3
}
fn default_warmup_interval_ms() -> u64 {
    100
}

fn default_stream_boundary() -> String {
    "bf".to_string()
}
fn default_capture_backoff_ms() -> u64 {
    50
}
fn default_report_interval_secs() -> u64 {
    5
}
