use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Landmark contours used by the eye heuristic, in the same normalized
/// full-frame space as the face box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceLandmarks {
    pub left_eyebrow: Vec<Point>,
    pub right_eyebrow: Vec<Point>,
}

/// One face as reported by the external detector for a frame. A frame with
/// no face is represented by `None` at the call site, not by this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceObservation {
    /// Normalized, origin bottom-left.
    pub bounding_box: Rect,
    pub yaw: Option<f32>,
    pub pitch: Option<f32>,
    pub roll: Option<f32>,
    pub landmarks: Option<FaceLandmarks>,
    pub capture_quality: Option<f32>,
}

impl FaceObservation {
    pub fn new(bounding_box: Rect) -> Self {
        Self {
            bounding_box,
            yaw: None,
            pitch: None,
            roll: None,
            landmarks: None,
            capture_quality: None,
        }
    }

    pub fn with_landmarks(mut self, landmarks: FaceLandmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    pub fn with_pose(mut self, yaw: f32, pitch: f32, roll: f32) -> Self {
        self.yaw = Some(yaw);
        self.pitch = Some(pitch);
        self.roll = Some(roll);
        self
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.capture_quality = Some(quality);
        self
    }

    /// A degenerate box is treated as no face.
    pub fn has_face(&self) -> bool {
        !self.bounding_box.is_empty()
    }
}
