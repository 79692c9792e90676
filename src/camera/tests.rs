use super::*;
use crate::config::{CaptureConfig, FrameConfig};
use crate::constraints::CaptureOptions;
use crate::error::{CameraError, FleetcamError, FrameError, MediaError};
use crate::frame::{decode_data_url, ImageFormat};
use crate::media::{
    DeviceKind, FrameCanvas, MediaDeviceInfo, MockMediaDevices, MockSurface, RasterCanvas,
    ReadyState, VideoSurface,
};
use std::sync::Arc;

fn create_test_session(cameras: usize) -> (Arc<MockMediaDevices>, CaptureSession) {
    let devices = Arc::new(MockMediaDevices::with_cameras(cameras));
    let session = CaptureSessionBuilder::new()
        .devices(devices.clone())
        .config(CaptureConfig::default())
        .build()
        .unwrap();
    (devices, session)
}

#[test]
fn test_builder_requires_devices() {
    let result = CaptureSessionBuilder::new().build();

    if let Err(FleetcamError::System { message }) = result {
        assert!(message.contains("Media devices must be specified"));
    } else {
        panic!("Expected system error for missing media devices");
    }
}

#[tokio::test]
async fn test_list_camera_devices_preserves_order_and_labels() {
    let (devices, session) = create_test_session(3);
    devices.add_device(MediaDeviceInfo {
        device_id: "mic-1".to_string(),
        kind: DeviceKind::AudioInput,
        label: "Microphone".to_string(),
        group_id: "group-mic".to_string(),
    });

    let cameras = session.list_camera_devices().await.unwrap();

    assert_eq!(cameras.len(), 3);
    let ids: Vec<_> = cameras.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["camera-1", "camera-2", "camera-3"]);
    assert!(cameras.iter().all(|c| !c.label.is_empty()));
    assert_eq!(cameras[1].label, "Camera 2");
}

#[tokio::test]
async fn test_list_camera_devices_releases_permission_probe() {
    let (devices, session) = create_test_session(1);

    session.list_camera_devices().await.unwrap();

    let streams = devices.issued_streams();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].stop_calls(), 1);
    assert!(!devices.requests()[0].audio);
}

#[tokio::test]
async fn test_list_camera_devices_permission_denied() {
    let (devices, session) = create_test_session(2);
    devices.deny_permission();

    let err = session.list_camera_devices().await.unwrap_err();

    assert!(err.is_permission_or_device());
    assert!(err.to_string().contains("grant camera permission"));
}

#[tokio::test]
async fn test_list_camera_devices_enumeration_failure() {
    let (devices, session) = create_test_session(1);
    devices.fail_enumeration(MediaError::Aborted("media subsystem unavailable".to_string()));

    let err = session.list_camera_devices().await.unwrap_err();
    assert!(err.is_permission_or_device());
}

#[tokio::test]
async fn test_list_camera_devices_without_cameras() {
    let (_devices, session) = create_test_session(0);

    let err = session.list_camera_devices().await.unwrap_err();
    assert!(matches!(
        err,
        FleetcamError::Camera(CameraError::PermissionOrDevice { .. })
    ));
}

#[tokio::test]
async fn test_start_camera_binds_and_plays() {
    let (devices, session) = create_test_session(2);
    let surface = MockSurface::new(640, 480);

    let handle = session
        .start_camera(&surface, Some("camera-2"), None)
        .await
        .unwrap();

    assert!(handle.is_active());
    assert!(surface.src_object().unwrap().same_stream(&handle));
    assert_eq!(surface.play_calls(), 1);

    let request = &devices.requests()[0];
    assert_eq!(request.exact_device_id(), Some("camera-2"));
    assert_eq!(request.video.width, 1280);
    assert!(!request.audio);
    assert_eq!(devices.issued_streams()[0].device_id(), "camera-2");
}

#[tokio::test]
async fn test_start_camera_applies_options() {
    let (devices, session) = create_test_session(1);
    let surface = MockSurface::new(640, 480);
    let options = CaptureOptions {
        width: Some(640),
        height: Some(480),
        ..Default::default()
    };

    session
        .start_camera(&surface, None, Some(&options))
        .await
        .unwrap();

    let request = &devices.requests()[0];
    assert_eq!(request.exact_device_id(), None);
    assert_eq!((request.video.width, request.video.height), (640, 480));
}

#[tokio::test]
async fn test_start_camera_twice_stops_previous_stream_once() {
    let (devices, session) = create_test_session(1);
    let surface = MockSurface::new(640, 480);

    let first = session.start_camera(&surface, None, None).await.unwrap();
    let second = session.start_camera(&surface, None, None).await.unwrap();

    let streams = devices.issued_streams();
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].stop_calls(), 1);
    assert_eq!(streams[1].stop_calls(), 0);
    assert!(!first.is_active());
    assert!(second.is_active());
    assert!(surface.src_object().unwrap().same_stream(&second));
}

#[tokio::test]
async fn test_start_camera_acquisition_failure() {
    let (devices, session) = create_test_session(1);
    let surface = MockSurface::new(640, 480);
    devices.fail_next_acquisition(MediaError::NotReadable("Device in use".to_string()));

    let err = session.start_camera(&surface, None, None).await.unwrap_err();

    assert!(err.is_camera_start());
    assert!(err.to_string().contains("another application"));
    assert!(surface.src_object().is_none());
}

#[tokio::test]
async fn test_start_camera_playback_failure_releases_stream() {
    let (devices, session) = create_test_session(1);
    let surface = MockSurface::new(640, 480);
    surface.fail_playback(MediaError::Aborted("play() interrupted".to_string()));

    let err = session.start_camera(&surface, None, None).await.unwrap_err();

    assert!(err.is_camera_start());
    assert!(surface.src_object().is_none());
    assert_eq!(devices.issued_streams()[0].stop_calls(), 1);
}

#[tokio::test]
async fn test_start_camera_metadata_failure() {
    let (_devices, session) = create_test_session(1);
    let surface = MockSurface::new(640, 480);
    surface.fail_metadata(MediaError::Other("decode error".to_string()));

    let err = session.start_camera(&surface, None, None).await.unwrap_err();
    assert!(err.is_camera_start());
    assert_eq!(surface.play_calls(), 0);
}

#[tokio::test]
async fn test_stop_camera_is_idempotent() {
    let (devices, session) = create_test_session(1);
    let surface = MockSurface::new(640, 480);

    session.stop_camera(&surface);

    session.start_camera(&surface, None, None).await.unwrap();
    session.stop_camera(&surface);
    session.stop_camera(&surface);

    assert!(surface.src_object().is_none());
    assert_eq!(devices.issued_streams()[0].stop_calls(), 1);
}

#[tokio::test]
async fn test_capture_frame_resizes_canvas_to_intrinsic_size() {
    let (_devices, session) = create_test_session(1);
    let surface = MockSurface::new(640, 480);
    let canvas = RasterCanvas::new(0, 0);
    session.start_camera(&surface, None, None).await.unwrap();

    let url = capture_frame(Some(&surface), Some(&canvas), ImageFormat::Jpeg, 0.8).unwrap();

    assert_eq!(canvas.dimensions(), (640, 480));
    assert!(url.starts_with("data:image/jpeg;base64,"));
    let (_, bytes) = decode_data_url(&url).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (640, 480));
}

#[test]
fn test_capture_frame_falls_back_to_display_size() {
    let surface = MockSurface::new(640, 480);
    surface.set_display_size(320, 240);
    let canvas = RasterCanvas::new(0, 0);

    capture_frame(Some(&surface), Some(&canvas), ImageFormat::Png, 1.0).unwrap();

    assert_eq!(canvas.dimensions(), (320, 240));
}

#[test]
fn test_capture_frame_with_nothing_to_draw() {
    let surface = MockSurface::new(640, 480);
    surface.set_display_size(0, 0);
    let canvas = RasterCanvas::new(10, 10);

    let url = capture_frame(Some(&surface), Some(&canvas), ImageFormat::Jpeg, 0.8).unwrap();
    assert_eq!(url, "data:,");
}

#[test]
fn test_capture_frame_missing_elements() {
    let surface = MockSurface::new(640, 480);
    let canvas = RasterCanvas::default();

    let no_canvas = capture_frame(Some(&surface), None, ImageFormat::Jpeg, 0.8).unwrap_err();
    assert!(no_canvas.is_missing_elements());

    let no_surface = capture_frame(None, Some(&canvas), ImageFormat::Jpeg, 0.8).unwrap_err();
    assert!(matches!(
        no_surface,
        FleetcamError::Frame(FrameError::MissingElements { missing: "video surface" })
    ));

    let neither = process_frame_for_analysis(None, None).unwrap_err();
    assert!(neither.is_missing_elements());
}

#[tokio::test]
async fn test_capture_frame_out_of_range_quality_still_encodes() {
    let (_devices, session) = create_test_session(1);
    let surface = MockSurface::new(64, 48);
    let canvas = RasterCanvas::default();
    session.start_camera(&surface, None, None).await.unwrap();

    let url = capture_frame(Some(&surface), Some(&canvas), ImageFormat::Jpeg, 7.0).unwrap();
    assert!(url.starts_with("data:image/jpeg;base64,"));
}

fn create_session_with_frame_config(frame: FrameConfig) -> CaptureSession {
    CaptureSessionBuilder::new()
        .devices(Arc::new(MockMediaDevices::with_cameras(1)))
        .frame_config(frame)
        .build()
        .unwrap()
}

#[test]
fn test_session_capture_uses_configured_format() {
    let session = create_session_with_frame_config(FrameConfig {
        format: ImageFormat::Png,
        quality: 0.8,
    });
    let surface = MockSurface::new(32, 24);
    let canvas = RasterCanvas::default();

    let url = session
        .capture_frame(Some(&surface), Some(&canvas), None, None)
        .unwrap();
    assert!(url.starts_with("data:image/png;base64,"));

    let url = session
        .capture_frame(Some(&surface), Some(&canvas), Some(ImageFormat::Jpeg), None)
        .unwrap();
    assert!(url.starts_with("data:image/jpeg;base64,"));
}

#[test]
fn test_session_capture_falls_back_to_configured_quality() {
    let session = create_session_with_frame_config(FrameConfig {
        format: ImageFormat::Jpeg,
        quality: 0.3,
    });
    // Unbound surface: the canvas takes the display size and stays blank,
    // so the encoded bytes depend only on the quality
    let surface = MockSurface::new(32, 24);
    let canvas = RasterCanvas::default();

    let fallback = session
        .capture_frame(Some(&surface), Some(&canvas), None, Some(7.0))
        .unwrap();
    let configured = capture_frame(Some(&surface), Some(&canvas), ImageFormat::Jpeg, 0.3).unwrap();
    let builtin_default =
        capture_frame(Some(&surface), Some(&canvas), ImageFormat::Jpeg, 7.0).unwrap();

    assert_eq!(fallback, configured);
    assert_ne!(fallback, builtin_default);
    assert_eq!(session.frame_config().quality, 0.3);
}

#[tokio::test]
async fn test_process_frame_for_analysis() {
    let (_devices, session) = create_test_session(1);
    let surface = MockSurface::new(64, 48);
    let canvas = RasterCanvas::default();
    session.start_camera(&surface, None, None).await.unwrap();

    let sample = process_frame_for_analysis(Some(&surface), Some(&canvas)).unwrap();

    assert!(!sample.frame_data.starts_with("data:"));
    assert!(!sample.frame_data.contains(";base64,"));
    assert!(chrono::DateTime::parse_from_rfc3339(&sample.timestamp).is_ok());
    assert!(sample.timestamp.ends_with('Z'));
    assert_eq!((sample.width, sample.height), (64, 48));

    let bytes = sample.decode().unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_process_frame_before_data_is_available() {
    let (_devices, session) = create_test_session(1);
    let surface = MockSurface::new(64, 48);
    let canvas = RasterCanvas::default();
    session.start_camera(&surface, None, None).await.unwrap();
    surface.set_ready_state(ReadyState::HaveMetadata);

    // The canvas is still sized and encoded, just without drawn content
    let sample = process_frame_for_analysis(Some(&surface), Some(&canvas)).unwrap();
    assert_eq!((sample.width, sample.height), (64, 48));
    assert!(!sample.is_empty());
}
