//! Capture options and the constraint builder.
//!
//! Precedence, highest first:
//! 1. the explicit `device_id` argument, then `CaptureOptions::device_id`
//! 2. `CaptureOptions::extra` overrides
//! 3. the typed `CaptureOptions` fields
//! 4. configured defaults

use crate::config::CaptureConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRateRange {
    pub ideal: f64,
    pub max: f64,
}

/// Caller-supplied tweaks for a single acquisition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub device_id: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<FrameRateRange>,
    pub extra: Option<ConstraintOverrides>,
}

/// Raw overrides merged over everything except the explicit device id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintOverrides {
    #[serde(default)]
    pub video: VideoOverrides,
    pub audio: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoOverrides {
    pub device_id: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<FrameRateRange>,
    pub facing_mode: Option<FacingMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

/// Device selection sent to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceConstraint {
    /// Only this device is acceptable
    Exact(String),
}

/// Fully resolved video constraints. `width` and `height` are ideal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceConstraint>,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRateRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facing_mode: Option<FacingMode>,
}

/// The constraints object handed to `MediaDevices::get_user_media`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: VideoConstraints,
    pub audio: bool,
}

impl MediaConstraints {
    /// Camera-only constraints built from configured defaults
    pub fn from_defaults(defaults: &CaptureConfig) -> Self {
        build_constraints(None, &CaptureOptions::default(), defaults)
    }

    /// Device id the constraints pin, if any
    pub fn exact_device_id(&self) -> Option<&str> {
        match &self.video.device_id {
            Some(DeviceConstraint::Exact(id)) => Some(id.as_str()),
            None => None,
        }
    }
}

/// Resolve acquisition constraints. Never fails: every field has a default.
pub fn build_constraints(
    device_id: Option<&str>,
    options: &CaptureOptions,
    defaults: &CaptureConfig,
) -> MediaConstraints {
    let overrides = options.extra.clone().unwrap_or_default();
    let video = overrides.video;

    let device_id = device_id
        .map(str::to_string)
        .or_else(|| options.device_id.clone())
        .or(video.device_id)
        .filter(|id| !id.is_empty())
        .map(DeviceConstraint::Exact);

    let frame_rate = video
        .frame_rate
        .or(options.frame_rate)
        .unwrap_or(FrameRateRange {
            ideal: defaults.frame_rate_ideal,
            max: defaults.frame_rate_max,
        });

    let constraints = MediaConstraints {
        video: VideoConstraints {
            device_id,
            width: video.width.or(options.width).unwrap_or(defaults.width),
            height: video.height.or(options.height).unwrap_or(defaults.height),
            frame_rate,
            facing_mode: video.facing_mode,
        },
        audio: overrides.audio.unwrap_or(defaults.audio),
    };

    debug!("Built media constraints: {:?}", constraints);
    constraints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_only() {
        let constraints = build_constraints(None, &CaptureOptions::default(), &CaptureConfig::default());

        assert_eq!(constraints.video.device_id, None);
        assert_eq!(constraints.video.width, 1280);
        assert_eq!(constraints.video.height, 720);
        assert_eq!(constraints.video.frame_rate, FrameRateRange { ideal: 15.0, max: 30.0 });
        assert!(!constraints.audio);
    }

    #[test]
    fn test_explicit_device_id_wins() {
        let options = CaptureOptions {
            device_id: Some("from-options".to_string()),
            extra: Some(ConstraintOverrides {
                video: VideoOverrides {
                    device_id: Some("from-extra".to_string()),
                    ..Default::default()
                },
                audio: None,
            }),
            ..Default::default()
        };

        let explicit = build_constraints(Some("cam-1"), &options, &CaptureConfig::default());
        assert_eq!(explicit.exact_device_id(), Some("cam-1"));

        let from_options = build_constraints(None, &options, &CaptureConfig::default());
        assert_eq!(from_options.exact_device_id(), Some("from-options"));
    }

    #[test]
    fn test_empty_device_id_means_platform_default() {
        let constraints = build_constraints(Some(""), &CaptureOptions::default(), &CaptureConfig::default());
        assert_eq!(constraints.exact_device_id(), None);
    }

    #[test]
    fn test_extra_overrides_typed_options() {
        let options = CaptureOptions {
            width: Some(640),
            height: Some(480),
            frame_rate: Some(FrameRateRange { ideal: 10.0, max: 20.0 }),
            extra: Some(ConstraintOverrides {
                video: VideoOverrides {
                    width: Some(320),
                    facing_mode: Some(FacingMode::Environment),
                    ..Default::default()
                },
                audio: Some(true),
            }),
            ..Default::default()
        };

        let constraints = build_constraints(None, &options, &CaptureConfig::default());

        assert_eq!(constraints.video.width, 320);
        assert_eq!(constraints.video.height, 480);
        assert_eq!(constraints.video.frame_rate, FrameRateRange { ideal: 10.0, max: 20.0 });
        assert_eq!(constraints.video.facing_mode, Some(FacingMode::Environment));
        assert!(constraints.audio);
    }

    #[test]
    fn test_serializes_like_host_constraints() {
        let constraints = build_constraints(Some("cam-1"), &CaptureOptions::default(), &CaptureConfig::default());
        let json = serde_json::to_value(&constraints).unwrap();

        assert_eq!(json["video"]["deviceId"]["exact"], "cam-1");
        assert_eq!(json["video"]["frameRate"]["max"], 30.0);
        assert_eq!(json["audio"], false);
    }
}
