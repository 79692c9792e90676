use crate::media::{DeviceKind, MediaDeviceInfo};
use serde::{Deserialize, Serialize};

/// Characters of the device id shown when the host withholds a label
const PLACEHOLDER_ID_CHARS: usize = 8;

/// A camera the user can pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub id: String,
    pub label: String,
    pub group_id: String,
}

impl DeviceDescriptor {
    /// Map a host device entry. `position` is the 1-based place among cameras.
    pub fn from_device_info(info: &MediaDeviceInfo, position: usize) -> Self {
        let label = if info.label.trim().is_empty() {
            placeholder_label(&info.device_id, position)
        } else {
            info.label.clone()
        };

        Self {
            id: info.device_id.clone(),
            label,
            group_id: info.group_id.clone(),
        }
    }
}

/// Keep only video inputs, in host order
pub(crate) fn camera_descriptors(devices: &[MediaDeviceInfo]) -> Vec<DeviceDescriptor> {
    devices
        .iter()
        .filter(|device| device.kind == DeviceKind::VideoInput)
        .enumerate()
        .map(|(i, device)| DeviceDescriptor::from_device_info(device, i + 1))
        .collect()
}

fn placeholder_label(device_id: &str, position: usize) -> String {
    let short: String = device_id.chars().take(PLACEHOLDER_ID_CHARS).collect();
    if short.is_empty() {
        format!("Camera {}", position)
    } else {
        format!("Camera {}", short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, kind: DeviceKind, label: &str) -> MediaDeviceInfo {
        MediaDeviceInfo {
            device_id: id.to_string(),
            kind,
            label: label.to_string(),
            group_id: "g".to_string(),
        }
    }

    #[test]
    fn test_filters_to_video_inputs_in_order() {
        let devices = vec![
            info("mic", DeviceKind::AudioInput, "Mic"),
            info("front", DeviceKind::VideoInput, "Front"),
            info("speaker", DeviceKind::AudioOutput, "Speaker"),
            info("rear", DeviceKind::VideoInput, "Rear"),
        ];

        let cameras = camera_descriptors(&devices);
        let ids: Vec<_> = cameras.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["front", "rear"]);
    }

    #[test]
    fn test_placeholder_labels() {
        let devices = vec![
            info("0123456789abcdef", DeviceKind::VideoInput, ""),
            info("", DeviceKind::VideoInput, "  "),
        ];

        let cameras = camera_descriptors(&devices);
        assert_eq!(cameras[0].label, "Camera 01234567");
        assert_eq!(cameras[1].label, "Camera 2");
    }
}
