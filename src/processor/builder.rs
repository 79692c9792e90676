use super::session::{create_frame_processor, FrameHandler, FrameProcessor, DEFAULT_PROCESSOR_INTERVAL};
use crate::config::ProcessorConfig;
use crate::error::{FleetcamError, FrameError, Result};
use crate::media::{FrameCanvas, VideoSurface};
use std::sync::Arc;
use std::time::Duration;

/// Builder for a frame processor
pub struct FrameProcessorBuilder<H> {
    surface: Option<Arc<dyn VideoSurface>>,
    canvas: Option<Arc<dyn FrameCanvas>>,
    handler: Option<H>,
    interval: Duration,
}

impl<H> FrameProcessorBuilder<H>
where
    H: FrameHandler + 'static,
{
    pub fn new() -> Self {
        Self {
            surface: None,
            canvas: None,
            handler: None,
            interval: DEFAULT_PROCESSOR_INTERVAL,
        }
    }

    pub fn surface(mut self, surface: Arc<dyn VideoSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn canvas(mut self, canvas: Arc<dyn FrameCanvas>) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn config(self, config: &ProcessorConfig) -> Self {
        self.interval(config.interval())
    }

    /// Spawn the processor. Must be called inside a tokio runtime.
    pub fn build(self) -> Result<FrameProcessor> {
        let (surface, canvas) = match (self.surface, self.canvas) {
            (Some(surface), Some(canvas)) => (surface, canvas),
            (None, Some(_)) => return Err(FrameError::MissingElements { missing: "video surface" }.into()),
            (Some(_), None) => return Err(FrameError::MissingElements { missing: "canvas target" }.into()),
            (None, None) => {
                return Err(FrameError::MissingElements {
                    missing: "video surface and canvas target",
                }
                .into())
            }
        };

        let handler = self
            .handler
            .ok_or_else(|| FleetcamError::system("Frame handler must be specified"))?;

        Ok(create_frame_processor(surface, canvas, handler, self.interval))
    }
}

impl<H> Default for FrameProcessorBuilder<H>
where
    H: FrameHandler + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
