use crate::constraints::MediaConstraints;
use crate::error::MediaError;
use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// One entry of the host's device enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub kind: DeviceKind,
    /// Empty until the user has granted media permission
    pub label: String,
    pub group_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

/// How much media a surface has buffered, in increasing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    /// The surface holds a frame that can be drawn
    pub fn has_current_data(&self) -> bool {
        *self >= ReadyState::HaveCurrentData
    }
}

/// Host media subsystem: device enumeration and stream acquisition
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// List every input and output device the host knows about
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError>;

    /// Acquire a live stream matching `constraints`
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, MediaError>;
}

pub trait MediaStream: Send + Sync {
    fn id(&self) -> String;

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;
}

pub trait MediaTrack: Send + Sync {
    fn kind(&self) -> TrackKind;

    fn label(&self) -> String;

    /// Release the underlying hardware. Stopping twice is harmless.
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// On-screen element a stream is bound to
#[async_trait]
pub trait VideoSurface: Send + Sync {
    /// Stream currently bound to the surface
    fn src_object(&self) -> Option<StreamHandle>;

    /// Bind or clear the surface's stream
    fn set_src_object(&self, stream: Option<StreamHandle>);

    /// Intrinsic video resolution, `(0, 0)` while unknown
    fn video_size(&self) -> (u32, u32);

    /// Size the surface is laid out at
    fn display_size(&self) -> (u32, u32);

    fn ready_state(&self) -> ReadyState;

    /// Resolves once the bound stream's metadata is available
    async fn loaded_metadata(&self) -> Result<(), MediaError>;

    /// Start playback of the bound stream
    async fn play(&self) -> Result<(), MediaError>;

    /// The frame currently presented, if any
    fn current_frame(&self) -> Option<RgbaImage>;
}

/// Ownership token for an acquired stream
#[derive(Clone)]
pub struct StreamHandle {
    stream: Arc<dyn MediaStream>,
}

impl StreamHandle {
    pub fn new(stream: Arc<dyn MediaStream>) -> Self {
        Self { stream }
    }

    pub fn id(&self) -> String {
        self.stream.id()
    }

    pub fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.stream.tracks()
    }

    pub fn track_count(&self) -> usize {
        self.stream.tracks().len()
    }

    /// At least one track still holds the device
    pub fn is_active(&self) -> bool {
        self.stream.tracks().iter().any(|track| track.is_live())
    }

    /// Stop every track, returning how many were stopped
    pub fn stop_tracks(&self) -> usize {
        let tracks = self.stream.tracks();
        for track in &tracks {
            track.stop();
        }
        tracks.len()
    }

    /// Both handles refer to the same underlying stream
    pub fn same_stream(&self, other: &StreamHandle) -> bool {
        Arc::ptr_eq(&self.stream, &other.stream)
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id())
            .field("tracks", &self.track_count())
            .finish()
    }
}
