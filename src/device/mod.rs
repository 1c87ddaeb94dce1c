//! Device calibration: which device is running, how many points make a
//! centimeter on its screen, and where its front camera sits.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Display name of the one device the camera offset was measured on.
pub const REFERENCE_DEVICE: &str = "iPhone 13 Pro";

/// Camera lens position relative to the screen origin on the reference device.
pub const REFERENCE_CAMERA_OFFSET_CM: Point = Point::new(2.6, 0.5);

/// Host-provided metrics for the running device.
pub trait DeviceMetricsProvider: Send + Sync {
    fn device_name(&self) -> String;

    /// `None` when the host has no calibration for this device.
    fn points_per_centimeter(&self) -> Option<f32>;
}

/// Metrics fixed at construction; what the binary and tests inject.
#[derive(Debug, Clone)]
pub struct FixedDeviceMetrics {
    pub name: String,
    pub points_per_cm: Option<f32>,
}

impl FixedDeviceMetrics {
    pub fn new(name: impl Into<String>, points_per_cm: Option<f32>) -> Self {
        Self {
            name: name.into(),
            points_per_cm,
        }
    }
}

impl DeviceMetricsProvider for FixedDeviceMetrics {
    fn device_name(&self) -> String {
        self.name.clone()
    }

    fn points_per_centimeter(&self) -> Option<f32> {
        self.points_per_cm
    }
}

/// Per-model calibration constants, keyed by device name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub name: String,
    pub camera_offset_cm: Point,
}

impl DeviceProfile {
    pub fn reference() -> Self {
        Self {
            name: REFERENCE_DEVICE.to_string(),
            camera_offset_cm: REFERENCE_CAMERA_OFFSET_CM,
        }
    }
}

/// Resolved calibration for the session's device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCalibration {
    pub device_name: String,
    pub points_per_cm: Option<f32>,
    pub camera_offset_cm: Point,
    /// False when no profile matched and the offset fell back to zero.
    pub profile_found: bool,
}

/// Combine the host metrics with the matching profile from `profiles`.
pub fn resolve_calibration(
    provider: &dyn DeviceMetricsProvider,
    profiles: &[DeviceProfile],
) -> DeviceCalibration {
    let device_name = provider.device_name();
    let profile = profiles
        .iter()
        .find(|profile| profile.name.eq_ignore_ascii_case(&device_name));

    DeviceCalibration {
        points_per_cm: provider.points_per_centimeter(),
        camera_offset_cm: profile
            .map(|profile| profile.camera_offset_cm)
            .unwrap_or(Point::ZERO),
        profile_found: profile.is_some(),
        device_name,
    }
}
