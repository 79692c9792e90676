use super::platform::VideoSurface;
use crate::error::FrameError;
use crate::frame::{encode_data_url, ImageFormat, EMPTY_DATA_URL};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, ImageEncoder, RgbaImage};
use parking_lot::Mutex;
use tracing::trace;

/// Offscreen 2D drawing target
pub trait FrameCanvas: Send + Sync {
    fn dimensions(&self) -> (u32, u32);

    /// Resize the canvas. Resizing always clears its content.
    fn set_dimensions(&self, width: u32, height: u32);

    /// Draw the surface's current frame scaled to fill the canvas
    fn draw_surface(&self, surface: &dyn VideoSurface) -> Result<(), FrameError>;

    /// Encode the canvas content as a data URL. `quality` is in [0, 1].
    fn to_data_url(&self, format: ImageFormat, quality: f32) -> Result<String, FrameError>;
}

/// In-memory RGBA canvas
pub struct RasterCanvas {
    pixels: Mutex<RgbaImage>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: Mutex::new(RgbaImage::new(width, height)),
        }
    }

    /// Copy of the current pixel buffer
    pub fn snapshot(&self) -> RgbaImage {
        self.pixels.lock().clone()
    }
}

impl Default for RasterCanvas {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl FrameCanvas for RasterCanvas {
    fn dimensions(&self) -> (u32, u32) {
        self.pixels.lock().dimensions()
    }

    fn set_dimensions(&self, width: u32, height: u32) {
        *self.pixels.lock() = RgbaImage::new(width, height);
    }

    fn draw_surface(&self, surface: &dyn VideoSurface) -> Result<(), FrameError> {
        let Some(frame) = surface.current_frame() else {
            trace!("Surface has no frame to draw");
            return Ok(());
        };

        let mut pixels = self.pixels.lock();
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Ok(());
        }

        if frame.dimensions() == (width, height) {
            *pixels = frame;
        } else {
            *pixels = imageops::resize(&frame, width, height, FilterType::Triangle);
        }

        Ok(())
    }

    fn to_data_url(&self, format: ImageFormat, quality: f32) -> Result<String, FrameError> {
        let pixels = self.pixels.lock();
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Ok(EMPTY_DATA_URL.to_string());
        }

        let mut encoded = Vec::new();
        let result = match format {
            ImageFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
                JpegEncoder::new_with_quality(&mut encoded, jpeg_quality(quality)).encode(
                    rgb.as_raw(),
                    width,
                    height,
                    ColorType::Rgb8,
                )
            }
            ImageFormat::Png => PngEncoder::new(&mut encoded).write_image(
                pixels.as_raw(),
                width,
                height,
                ColorType::Rgba8,
            ),
        };

        result.map_err(|e| FrameError::Encode {
            format: format.to_string(),
            details: e.to_string(),
        })?;

        trace!("Encoded {}x{} canvas as {} ({} bytes)", width, height, format, encoded.len());
        Ok(encode_data_url(format, &encoded))
    }
}

/// Map a [0, 1] quality onto the JPEG encoder's 1..=100 scale
fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
}
