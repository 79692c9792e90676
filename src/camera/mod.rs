mod builder;
mod capture;
mod devices;
mod session;
#[cfg(test)]
mod tests;

pub use builder::CaptureSessionBuilder;
pub use capture::{capture_frame, process_frame_for_analysis};
pub use devices::DeviceDescriptor;
pub use session::CaptureSession;
