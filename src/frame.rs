use crate::error::FrameError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality used when the caller does not ask for a specific one
pub const DEFAULT_CAPTURE_QUALITY: f32 = 0.8;

/// Fixed quality for frames handed to analysis callbacks
pub const ANALYSIS_QUALITY: f32 = 0.7;

/// Data URL produced by a canvas with no pixels
pub const EMPTY_DATA_URL: &str = "data:,";

/// Image encodings a canvas can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossy JPEG, honours the quality argument
    #[default]
    Jpeg,
    /// Lossless PNG, quality is ignored
    Png,
}

impl ImageFormat {
    /// MIME type used in the data URL header
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    /// Parse a MIME type such as `image/jpeg`
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    /// File extension for frames written to disk
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, ImageFormat::Jpeg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// A single extracted frame, ready for an analysis callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSample {
    /// Base64 encoded image, without the data URL header
    pub frame_data: String,
    /// ISO-8601 capture time in UTC
    pub timestamp: String,
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
}

impl FrameSample {
    /// Build a sample from a canvas data URL, stamping it with `captured_at`
    pub fn from_data_url(data_url: &str, width: u32, height: u32, captured_at: DateTime<Utc>) -> Self {
        Self {
            frame_data: strip_data_url_prefix(data_url).to_string(),
            timestamp: format_timestamp(captured_at),
            width,
            height,
        }
    }

    /// Decode the encoded image bytes
    pub fn decode(&self) -> Result<Vec<u8>, FrameError> {
        Ok(STANDARD.decode(self.frame_data.as_bytes())?)
    }

    /// Parse the capture timestamp back into a UTC time
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn is_empty(&self) -> bool {
        self.frame_data.is_empty()
    }
}

/// Format a timestamp the way host UIs print `Date.toISOString()`
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build a base64 data URL for encoded image bytes
pub fn encode_data_url(format: ImageFormat, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", format.mime_type(), STANDARD.encode(bytes))
}

/// Return the payload of a data URL. Strings that are not data URLs are returned unchanged.
pub fn strip_data_url_prefix(data_url: &str) -> &str {
    if !data_url.starts_with("data:") {
        return data_url;
    }
    match data_url.find(',') {
        Some(idx) => &data_url[idx + 1..],
        None => data_url,
    }
}

/// Split a base64 data URL into its format and decoded bytes
pub fn decode_data_url(data_url: &str) -> Result<(Option<ImageFormat>, Vec<u8>), FrameError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or(FrameError::InvalidDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(FrameError::InvalidDataUrl)?;

    let mime = header.strip_suffix(";base64").ok_or(FrameError::InvalidDataUrl)?;
    let bytes = STANDARD.decode(payload.as_bytes())?;

    Ok((ImageFormat::from_mime_type(mime), bytes))
}
