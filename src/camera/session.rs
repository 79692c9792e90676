use super::capture::capture_with_fallback;
use super::devices::{camera_descriptors, DeviceDescriptor};
use crate::config::{CaptureConfig, FrameConfig};
use crate::constraints::{build_constraints, CaptureOptions, MediaConstraints};
use crate::error::{CameraError, MediaError, Result};
use crate::frame::ImageFormat;
use crate::media::{FrameCanvas, MediaDevices, StreamHandle, VideoSurface};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Facade over the host media subsystem used by UI code
pub struct CaptureSession {
    devices: Arc<dyn MediaDevices>,
    config: CaptureConfig,
    frame: FrameConfig,
}

impl CaptureSession {
    pub fn new(devices: Arc<dyn MediaDevices>, config: CaptureConfig) -> Self {
        Self::with_frame_config(devices, config, FrameConfig::default())
    }

    pub fn with_frame_config(
        devices: Arc<dyn MediaDevices>,
        config: CaptureConfig,
        frame: FrameConfig,
    ) -> Self {
        Self {
            devices,
            config,
            frame,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn frame_config(&self) -> &FrameConfig {
        &self.frame
    }

    /// List cameras, asking for permission first so their labels are visible
    pub async fn list_camera_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let probe = MediaConstraints::from_defaults(&CaptureConfig {
            audio: false,
            ..self.config.clone()
        });

        let permission_stream = self
            .devices
            .get_user_media(&probe)
            .await
            .map_err(permission_error)?;
        StreamHandle::new(permission_stream).stop_tracks();

        let devices = self
            .devices
            .enumerate_devices()
            .await
            .map_err(permission_error)?;

        let cameras = camera_descriptors(&devices);
        info!("Found {} camera device(s)", cameras.len());
        Ok(cameras)
    }

    /// Acquire a camera stream and bind it to `surface`, replacing any previous stream
    pub async fn start_camera(
        &self,
        surface: &dyn VideoSurface,
        device_id: Option<&str>,
        options: Option<&CaptureOptions>,
    ) -> Result<StreamHandle> {
        let default_options = CaptureOptions::default();
        let constraints = build_constraints(
            device_id,
            options.unwrap_or(&default_options),
            &self.config,
        );

        info!(
            "Starting camera {} ({}x{} @ {}fps)",
            constraints.exact_device_id().unwrap_or("default"),
            constraints.video.width,
            constraints.video.height,
            constraints.video.frame_rate.ideal
        );

        if let Some(previous) = surface.src_object() {
            debug!("Releasing previous stream {} before rebinding", previous.id());
            previous.stop_tracks();
            surface.set_src_object(None);
        }

        let stream = self
            .devices
            .get_user_media(&constraints)
            .await
            .map_err(start_error)?;
        let handle = StreamHandle::new(stream);

        surface.set_src_object(Some(handle.clone()));

        let playback = async {
            surface.loaded_metadata().await?;
            surface.play().await
        };

        if let Err(e) = playback.await {
            error!("Camera stream {} failed to start playback: {}", handle.id(), e);
            handle.stop_tracks();
            surface.set_src_object(None);
            return Err(start_error(e).into());
        }

        info!("Camera stream {} started with {} track(s)", handle.id(), handle.track_count());
        Ok(handle)
    }

    /// Release the surface's stream. Does nothing when no stream is bound.
    pub fn stop_camera(&self, surface: &dyn VideoSurface) {
        match surface.src_object() {
            Some(stream) => {
                let stopped = stream.stop_tracks();
                surface.set_src_object(None);
                info!("Stopped camera stream {} ({} track(s))", stream.id(), stopped);
            }
            None => debug!("stop_camera called with no stream bound"),
        }
    }

    /// Still capture using the `[frame]` settings for anything the caller leaves out.
    /// An out-of-range `quality` is replaced by the configured one.
    pub fn capture_frame(
        &self,
        surface: Option<&dyn VideoSurface>,
        canvas: Option<&dyn FrameCanvas>,
        format: Option<ImageFormat>,
        quality: Option<f32>,
    ) -> Result<String> {
        capture_with_fallback(
            surface,
            canvas,
            format.unwrap_or(self.frame.format),
            quality.unwrap_or(self.frame.quality),
            self.frame.quality,
        )
    }
}

fn permission_error(e: MediaError) -> CameraError {
    warn!("Camera enumeration failed: {}", e);
    CameraError::PermissionOrDevice {
        details: e.to_string(),
    }
}

fn start_error(e: MediaError) -> CameraError {
    CameraError::Start {
        details: e.to_string(),
    }
}
