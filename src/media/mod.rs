mod canvas;
pub mod mock;
mod platform;

pub use canvas::{FrameCanvas, RasterCanvas};
pub use mock::{MockMediaDevices, MockStream, MockSurface, MockTrack};
pub use platform::{
    DeviceKind, MediaDeviceInfo, MediaDevices, MediaStream, MediaTrack, ReadyState, StreamHandle,
    TrackKind, VideoSurface,
};
