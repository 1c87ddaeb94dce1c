use serde::{Deserialize, Serialize};

use crate::geometry::Point;

use super::DeviceOrientation;

/// An uncompressed RGBA8 camera frame as handed over by the frame source.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    /// Seconds on the capture clock.
    pub timestamp_secs: f64,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>, timestamp_secs: f64) -> Self {
        Self {
            width,
            height,
            rgba,
            timestamp_secs,
        }
    }

    /// A uniformly filled frame; mostly useful for synthetic sources.
    pub fn filled(width: u32, height: u32, color: [u8; 4], timestamp_secs: f64) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut rgba = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            rgba.extend_from_slice(&color);
        }
        Self::new(width, height, rgba, timestamp_secs)
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Screen state at the time a frame was processed, in device points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenMetrics {
    pub width: u32,
    pub height: u32,
    pub orientation: DeviceOrientation,
}

impl ScreenMetrics {
    pub fn new(width: u32, height: u32, orientation: DeviceOrientation) -> Self {
        Self {
            width,
            height,
            orientation,
        }
    }
}

/// The calibration dot shown while a frame was captured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSample {
    pub dot_index: u32,
    /// Device coordinates, origin top-left.
    pub position: Point,
    /// Seconds since the dot sequence started.
    pub time_secs: f32,
}
