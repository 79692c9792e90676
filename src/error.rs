use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("System error: {message}")]
    System { message: String },
}

/// Failures surfaced to the user while talking to camera hardware
#[derive(Error, Debug)]
pub enum CameraError {
    #[error(
        "Unable to access camera devices ({details}). Please grant camera permission in your browser or system settings and try again"
    )]
    PermissionOrDevice { details: String },

    #[error(
        "Failed to start camera ({details}). Another application may be holding the camera; close it and try again"
    )]
    Start { details: String },
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame capture requires a video surface and a canvas target (missing: {missing})")]
    MissingElements { missing: &'static str },

    #[error("Failed to encode frame as {format}: {details}")]
    Encode { format: String, details: String },

    #[error("Malformed data URL")]
    InvalidDataUrl,

    #[error("Failed to decode frame data: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Failure classes reported by the host media subsystem
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("permission denied: {0}")]
    NotAllowed(String),

    #[error("device not found: {0}")]
    NotFound(String),

    #[error("device not readable: {0}")]
    NotReadable(String),

    #[error("constraints cannot be satisfied: {0}")]
    Overconstrained(String),

    #[error("operation aborted: {0}")]
    Aborted(String),

    #[error("{0}")]
    Other(String),
}

impl FleetcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn is_permission_or_device(&self) -> bool {
        matches!(self, Self::Camera(CameraError::PermissionOrDevice { .. }))
    }

    pub fn is_camera_start(&self) -> bool {
        matches!(self, Self::Camera(CameraError::Start { .. }))
    }

    pub fn is_missing_elements(&self) -> bool {
        matches!(self, Self::Frame(FrameError::MissingElements { .. }))
    }
}

pub type Result<T> = std::result::Result<T, FleetcamError>;
