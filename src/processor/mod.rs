mod builder;
mod session;

pub use builder::FrameProcessorBuilder;
pub use session::{
    create_frame_processor, CycleOutcome, FrameHandler, FrameProcessor, PollingSession,
    ProcessorStats, ProcessorStatsSnapshot, DEFAULT_PROCESSOR_INTERVAL,
};
