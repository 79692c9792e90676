pub mod camera;
pub mod config;
pub mod constraints;
pub mod error;
pub mod frame;
pub mod media;
pub mod processor;

pub use camera::{
    capture_frame, process_frame_for_analysis, CaptureSession, CaptureSessionBuilder,
    DeviceDescriptor,
};
pub use config::{CaptureConfig, FleetcamConfig, FrameConfig, ProcessorConfig};
pub use constraints::{build_constraints, CaptureOptions, ConstraintOverrides, FrameRateRange, MediaConstraints};
pub use error::{CameraError, FleetcamError, FrameError, MediaError, Result};
pub use frame::{FrameSample, ImageFormat};
pub use media::{FrameCanvas, MediaDevices, RasterCanvas, ReadyState, StreamHandle, VideoSurface};
pub use processor::{
    create_frame_processor, CycleOutcome, FrameHandler, FrameProcessor, FrameProcessorBuilder,
    PollingSession, ProcessorStatsSnapshot,
};
