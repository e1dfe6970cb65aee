use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera initialization failed: {details}")]
    InitFailed { details: String },

    #[error("Frame capture failed: {details}")]
    Capture { details: String },

    #[error("Camera returned an empty frame")]
    EmptyFrame,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    BindFailed {
        address: String,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CamstreamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

impl CameraError {
    pub fn init<S: Into<String>>(details: S) -> Self {
        Self::InitFailed {
            details: details.into(),
        }
    }

    pub fn capture<S: Into<String>>(details: S) -> Self {
        Self::Capture {
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CamstreamError>;
