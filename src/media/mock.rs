//! In-memory media host for tests and for running without camera hardware.

use super::platform::{
    DeviceKind, MediaDeviceInfo, MediaDevices, MediaStream, MediaTrack, ReadyState, StreamHandle,
    TrackKind, VideoSurface,
};
use crate::constraints::MediaConstraints;
use crate::error::MediaError;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct MockTrack {
    id: String,
    kind: TrackKind,
    label: String,
    live: AtomicBool,
    stop_calls: AtomicUsize,
}

impl MockTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            live: AtomicBool::new(true),
            stop_calls: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of times `stop` was called on this track
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl MediaTrack for MockTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

pub struct MockStream {
    id: String,
    device_id: String,
    tracks: Vec<Arc<MockTrack>>,
}

impl MockStream {
    pub fn new(device_id: impl Into<String>, tracks: Vec<Arc<MockTrack>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            device_id: device_id.into(),
            tracks,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn mock_tracks(&self) -> &[Arc<MockTrack>] {
        &self.tracks
    }

    /// Sum of `stop` calls across all tracks
    pub fn stop_calls(&self) -> usize {
        self.tracks.iter().map(|track| track.stop_calls()).sum()
    }
}

impl MediaStream for MockStream {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .map(|track| Arc::clone(track) as Arc<dyn MediaTrack>)
            .collect()
    }
}

#[derive(Default)]
struct DevicesState {
    devices: Vec<MediaDeviceInfo>,
    permission_denied: bool,
    permission_granted: bool,
    enumeration_error: Option<MediaError>,
    acquisition_error: Option<MediaError>,
    requests: Vec<MediaConstraints>,
    streams: Vec<Arc<MockStream>>,
}

/// Fake host media subsystem. Labels stay hidden until a stream has been granted.
#[derive(Default)]
pub struct MockMediaDevices {
    state: Mutex<DevicesState>,
}

impl MockMediaDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with `count` cameras named `Camera 1..=count`
    pub fn with_cameras(count: usize) -> Self {
        let devices = Self::new();
        for i in 1..=count {
            devices.add_device(MediaDeviceInfo {
                device_id: format!("camera-{}", i),
                kind: DeviceKind::VideoInput,
                label: format!("Camera {}", i),
                group_id: format!("group-{}", i),
            });
        }
        devices
    }

    pub fn add_device(&self, device: MediaDeviceInfo) {
        self.state.lock().devices.push(device);
    }

    /// Refuse every permission request
    pub fn deny_permission(&self) {
        self.state.lock().permission_denied = true;
    }

    /// Make the next enumeration fail with `error`
    pub fn fail_enumeration(&self, error: MediaError) {
        self.state.lock().enumeration_error = Some(error);
    }

    /// Make the next acquisition fail with `error`
    pub fn fail_next_acquisition(&self, error: MediaError) {
        self.state.lock().acquisition_error = Some(error);
    }

    /// Every constraints object passed to `get_user_media`
    pub fn requests(&self) -> Vec<MediaConstraints> {
        self.state.lock().requests.clone()
    }

    /// Every stream handed out so far, oldest first
    pub fn issued_streams(&self) -> Vec<Arc<MockStream>> {
        self.state.lock().streams.clone()
    }
}

#[async_trait]
impl MediaDevices for MockMediaDevices {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError> {
        let mut state = self.state.lock();
        if let Some(error) = state.enumeration_error.take() {
            return Err(error);
        }

        let reveal_labels = state.permission_granted;
        Ok(state
            .devices
            .iter()
            .cloned()
            .map(|mut device| {
                if !reveal_labels {
                    device.label.clear();
                }
                device
            })
            .collect())
    }

    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, MediaError> {
        let mut state = self.state.lock();
        state.requests.push(constraints.clone());

        if state.permission_denied {
            return Err(MediaError::NotAllowed("Permission denied".to_string()));
        }
        if let Some(error) = state.acquisition_error.take() {
            return Err(error);
        }

        let device = match constraints.exact_device_id() {
            Some(id) => state
                .devices
                .iter()
                .find(|d| d.kind == DeviceKind::VideoInput && d.device_id == id)
                .cloned()
                .ok_or_else(|| MediaError::Overconstrained(format!("No camera with id {}", id)))?,
            None => state
                .devices
                .iter()
                .find(|d| d.kind == DeviceKind::VideoInput)
                .cloned()
                .ok_or_else(|| MediaError::NotFound("Requested device not found".to_string()))?,
        };

        let mut tracks = vec![Arc::new(MockTrack::new(TrackKind::Video, device.label.clone()))];
        if constraints.audio {
            tracks.push(Arc::new(MockTrack::new(TrackKind::Audio, "Microphone")));
        }

        let stream = Arc::new(MockStream::new(device.device_id.clone(), tracks));
        debug!("Mock host granted stream {} for {}", stream.id, device.device_id);

        state.permission_granted = true;
        state.streams.push(Arc::clone(&stream));

        Ok(stream as Arc<dyn MediaStream>)
    }
}

#[derive(Clone, Copy)]
enum ReadyOverride {
    Auto,
    Fixed(ReadyState),
}

/// Fake video element that renders a moving test pattern
pub struct MockSurface {
    stream: Mutex<Option<StreamHandle>>,
    intrinsic_size: Mutex<(u32, u32)>,
    display_size: Mutex<(u32, u32)>,
    ready: Mutex<ReadyOverride>,
    metadata_error: Mutex<Option<MediaError>>,
    play_error: Mutex<Option<MediaError>>,
    play_calls: AtomicUsize,
    frames_rendered: AtomicU64,
}

impl MockSurface {
    /// Surface whose streams report an intrinsic size of `width` x `height`
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            stream: Mutex::new(None),
            intrinsic_size: Mutex::new((width, height)),
            display_size: Mutex::new((width, height)),
            ready: Mutex::new(ReadyOverride::Auto),
            metadata_error: Mutex::new(None),
            play_error: Mutex::new(None),
            play_calls: AtomicUsize::new(0),
            frames_rendered: AtomicU64::new(0),
        }
    }

    pub fn set_intrinsic_size(&self, width: u32, height: u32) {
        *self.intrinsic_size.lock() = (width, height);
    }

    pub fn set_display_size(&self, width: u32, height: u32) {
        *self.display_size.lock() = (width, height);
    }

    /// Pin the reported ready state regardless of the binding
    pub fn set_ready_state(&self, state: ReadyState) {
        *self.ready.lock() = ReadyOverride::Fixed(state);
    }

    /// Go back to deriving the ready state from the binding
    pub fn clear_ready_state(&self) {
        *self.ready.lock() = ReadyOverride::Auto;
    }

    pub fn fail_metadata(&self, error: MediaError) {
        *self.metadata_error.lock() = Some(error);
    }

    pub fn fail_playback(&self, error: MediaError) {
        *self.play_error.lock() = Some(error);
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::SeqCst)
    }

    fn has_live_stream(&self) -> bool {
        self.stream
            .lock()
            .as_ref()
            .map(|stream| stream.is_active())
            .unwrap_or(false)
    }
}

#[async_trait]
impl VideoSurface for MockSurface {
    fn src_object(&self) -> Option<StreamHandle> {
        self.stream.lock().clone()
    }

    fn set_src_object(&self, stream: Option<StreamHandle>) {
        *self.stream.lock() = stream;
    }

    fn video_size(&self) -> (u32, u32) {
        if self.has_live_stream() {
            *self.intrinsic_size.lock()
        } else {
            (0, 0)
        }
    }

    fn display_size(&self) -> (u32, u32) {
        *self.display_size.lock()
    }

    fn ready_state(&self) -> ReadyState {
        match *self.ready.lock() {
            ReadyOverride::Fixed(state) => state,
            ReadyOverride::Auto if self.has_live_stream() => ReadyState::HaveEnoughData,
            ReadyOverride::Auto => ReadyState::HaveNothing,
        }
    }

    async fn loaded_metadata(&self) -> Result<(), MediaError> {
        if let Some(error) = self.metadata_error.lock().take() {
            return Err(error);
        }
        if self.stream.lock().is_none() {
            return Err(MediaError::Aborted("No stream bound to surface".to_string()));
        }
        Ok(())
    }

    async fn play(&self) -> Result<(), MediaError> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        match self.play_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn current_frame(&self) -> Option<RgbaImage> {
        if !self.ready_state().has_current_data() {
            return None;
        }

        let (width, height) = self.video_size();
        if width == 0 || height == 0 {
            return None;
        }

        let sequence = self.frames_rendered.fetch_add(1, Ordering::SeqCst);
        Some(test_pattern(width, height, sequence))
    }
}

/// Diagonal gradient that shifts with every frame
pub fn test_pattern(width: u32, height: u32, sequence: u64) -> RgbaImage {
    let shift = (sequence % 256) as u32;
    RgbaImage::from_fn(width, height, |x, y| {
        let r = ((x * 255) / width.max(1) + shift) % 256;
        let g = ((y * 255) / height.max(1) + shift) % 256;
        let b = ((x + y + shift) / 2) % 256;
        Rgba([r as u8, g as u8, b as u8, 255])
    })
}
