use crate::error::{FrameError, Result};
use crate::frame::{FrameSample, ImageFormat, ANALYSIS_QUALITY, DEFAULT_CAPTURE_QUALITY};
use crate::media::{FrameCanvas, VideoSurface};
use chrono::Utc;
use tracing::{trace, warn};

fn require_elements<'a>(
    surface: Option<&'a dyn VideoSurface>,
    canvas: Option<&'a dyn FrameCanvas>,
) -> std::result::Result<(&'a dyn VideoSurface, &'a dyn FrameCanvas), FrameError> {
    match (surface, canvas) {
        (Some(surface), Some(canvas)) => Ok((surface, canvas)),
        (None, Some(_)) => Err(FrameError::MissingElements { missing: "video surface" }),
        (Some(_), None) => Err(FrameError::MissingElements { missing: "canvas target" }),
        (None, None) => Err(FrameError::MissingElements {
            missing: "video surface and canvas target",
        }),
    }
}

/// Draw the surface's current frame into `canvas` and encode it as a data URL.
///
/// The canvas is resized to the surface's intrinsic resolution, or to its
/// display size while the intrinsic size is unknown.
pub fn capture_frame(
    surface: Option<&dyn VideoSurface>,
    canvas: Option<&dyn FrameCanvas>,
    format: ImageFormat,
    quality: f32,
) -> Result<String> {
    capture_with_fallback(surface, canvas, format, quality, DEFAULT_CAPTURE_QUALITY)
}

/// Like [`capture_frame`], substituting `fallback_quality` for a quality outside [0, 1]
pub(crate) fn capture_with_fallback(
    surface: Option<&dyn VideoSurface>,
    canvas: Option<&dyn FrameCanvas>,
    format: ImageFormat,
    quality: f32,
    fallback_quality: f32,
) -> Result<String> {
    let (surface, canvas) = require_elements(surface, canvas)?;

    let quality = if (0.0..=1.0).contains(&quality) {
        quality
    } else {
        warn!(
            "Ignoring out-of-range capture quality {}, using {}",
            quality, fallback_quality
        );
        fallback_quality
    };

    let (width, height) = match surface.video_size() {
        (0, _) | (_, 0) => surface.display_size(),
        size => size,
    };
    canvas.set_dimensions(width, height);
    canvas.draw_surface(surface)?;

    trace!("Captured {}x{} frame as {}", width, height, format);
    Ok(canvas.to_data_url(format, quality)?)
}

/// Extract a JPEG frame for an analysis callback
pub fn process_frame_for_analysis(
    surface: Option<&dyn VideoSurface>,
    canvas: Option<&dyn FrameCanvas>,
) -> Result<FrameSample> {
    let data_url = capture_frame(surface, canvas, ImageFormat::Jpeg, ANALYSIS_QUALITY)?;
    let captured_at = Utc::now();

    // capture_frame already rejected a missing canvas
    let (width, height) = canvas.map(|c| c.dimensions()).unwrap_or_default();

    Ok(FrameSample::from_data_url(&data_url, width, height, captured_at))
}
