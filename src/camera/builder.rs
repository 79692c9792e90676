use super::session::CaptureSession;
use crate::config::{CaptureConfig, FrameConfig};
use crate::error::{FleetcamError, Result};
use crate::media::MediaDevices;
use std::sync::Arc;

/// Builder for a camera capture session
pub struct CaptureSessionBuilder {
    devices: Option<Arc<dyn MediaDevices>>,
    config: Option<CaptureConfig>,
    frame: Option<FrameConfig>,
}

impl CaptureSessionBuilder {
    pub fn new() -> Self {
        Self {
            devices: None,
            config: None,
            frame: None,
        }
    }

    pub fn devices(mut self, devices: Arc<dyn MediaDevices>) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn config(mut self, config: CaptureConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn build(self) -> Result<CaptureSession> {
        let devices = self
            .devices
            .ok_or_else(|| FleetcamError::system("Media devices must be specified"))?;

        Ok(CaptureSession::with_frame_config(
            devices,
            self.config.unwrap_or_default(),
            self.frame.unwrap_or_default(),
        ))
    }
}

impl Default for CaptureSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
