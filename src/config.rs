use crate::frame::ImageFormat;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FleetcamConfig {
    pub capture: CaptureConfig,
    pub frame: FrameConfig,
    pub processor: ProcessorConfig,
}

/// Defaults applied to every camera acquisition
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Preferred video width in pixels
    #[serde(default = "default_capture_width")]
    pub width: u32,

    /// Preferred video height in pixels
    #[serde(default = "default_capture_height")]
    pub height: u32,

    /// Ideal frame rate requested from the camera
    #[serde(default = "default_frame_rate_ideal")]
    pub frame_rate_ideal: f64,

    /// Upper bound on the camera frame rate
    #[serde(default = "default_frame_rate_max")]
    pub frame_rate_max: f64,

    /// Request an audio track alongside video
    #[serde(default = "default_audio")]
    pub audio: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FrameConfig {
    /// Encoding used by still captures
    #[serde(default)]
    pub format: ImageFormat,

    /// Encoder quality in [0, 1]
    #[serde(default = "default_frame_quality")]
    pub quality: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Delay between the end of one cycle and the start of the next
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl ProcessorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl FleetcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("fleetcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("capture.width", default_capture_width())?
            .set_default("capture.height", default_capture_height())?
            .set_default("capture.frame_rate_ideal", default_frame_rate_ideal())?
            .set_default("capture.frame_rate_max", default_frame_rate_max())?
            .set_default("capture.audio", default_audio())?
            .set_default("frame.format", "jpeg")?
            .set_default("frame.quality", default_frame_quality() as f64)?
            .set_default("processor.interval_ms", default_interval_ms() as i64)?
            .add_source(File::with_name(&path_str).required(false))
            // FLEETCAM_PROCESSOR__INTERVAL_MS=500
            .add_source(
                Environment::with_prefix("FLEETCAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: FleetcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(ConfigError::Message(
                "Capture width and height must be greater than 0".to_string(),
            ));
        }

        if !(self.capture.frame_rate_ideal > 0.0) {
            return Err(ConfigError::Message(
                "Capture frame_rate_ideal must be greater than 0".to_string(),
            ));
        }

        if !(self.capture.frame_rate_max >= self.capture.frame_rate_ideal) {
            return Err(ConfigError::Message(
                "Capture frame_rate_max must not be lower than frame_rate_ideal".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.frame.quality) {
            return Err(ConfigError::Message(
                "Frame quality must be between 0 and 1".to_string(),
            ));
        }

        if self.processor.interval_ms == 0 {
            return Err(ConfigError::Message(
                "Processor interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for FleetcamConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            frame: FrameConfig::default(),
            processor: ProcessorConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: default_capture_width(),
            height: default_capture_height(),
            frame_rate_ideal: default_frame_rate_ideal(),
            frame_rate_max: default_frame_rate_max(),
            audio: default_audio(),
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            format: ImageFormat::default(),
            quality: default_frame_quality(),
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

// Default value functions
fn default_capture_width() -> u32 {
    1280
}
fn default_capture_height() -> u32 {
    720
}
fn default_frame_rate_ideal() -> f64 {
    15.0
}
fn default_frame_rate_max() -> f64 {
    30.0
}
fn default_audio() -> bool {
    false
}

fn default_frame_quality() -> f32 {
    crate::frame::DEFAULT_CAPTURE_QUALITY
}

fn default_interval_ms() -> u64 {
    200
}
