//! Column-oriented per-frame series. Index `i` of every column describes
//! frame `i`; [`SessionSeries::push`] is the only way in, so the columns
//! cannot drift apart.

use crate::error::RecorderError;
use crate::geometry::{Point, Rect};
use crate::models::ScreenMetrics;

/// Parallel columns for one bounding box table (face, left eye, right eye).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxSeries {
    pub heights: Vec<f32>,
    pub widths: Vec<f32>,
    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
    pub valids: Vec<u8>,
}

impl BoxSeries {
    fn push(&mut self, rect: Rect, valid: bool) {
        self.heights.push(rect.height);
        self.widths.push(rect.width);
        self.xs.push(rect.x);
        self.ys.push(rect.y);
        self.valids.push(u8::from(valid));
    }

    fn lengths(&self) -> [usize; 5] {
        [
            self.heights.len(),
            self.widths.len(),
            self.xs.len(),
            self.ys.len(),
            self.valids.len(),
        ]
    }

    pub fn len(&self) -> usize {
        self.valids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valids.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.valids.iter().filter(|v| **v == 1).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenSeries {
    pub heights: Vec<u32>,
    pub widths: Vec<u32>,
    pub orientations: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DotSeries {
    pub dot_nums: Vec<i32>,
    pub x_pts: Vec<f32>,
    pub y_pts: Vec<f32>,
    pub x_cam: Vec<f32>,
    pub y_cam: Vec<f32>,
    pub times: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseSeries {
    pub yaw: Vec<f32>,
    pub pitch: Vec<f32>,
    pub roll: Vec<f32>,
    pub quality: Vec<f32>,
}

/// Calibration dot state for one frame. `dot_num` is -1 when no dot was shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotEntry {
    pub dot_num: i32,
    pub device: Point,
    pub camera: Point,
    pub time_secs: f32,
}

impl DotEntry {
    pub const NONE: DotEntry = DotEntry {
        dot_num: -1,
        device: Point::ZERO,
        camera: Point::ZERO,
        time_secs: 0.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseEntry {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub quality: f32,
}

/// Everything recorded for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEntry {
    pub face: Rect,
    pub face_valid: bool,
    pub left_eye: Rect,
    pub left_eye_valid: bool,
    pub right_eye: Rect,
    pub right_eye_valid: bool,
    pub screen: ScreenMetrics,
    pub dot: DotEntry,
    pub pose: PoseEntry,
    pub frame_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSeries {
    pub face: BoxSeries,
    pub left_eye: BoxSeries,
    pub right_eye: BoxSeries,
    pub screen: ScreenSeries,
    pub dots: DotSeries,
    pub pose: PoseSeries,
    pub frame_names: Vec<String>,
}

impl SessionSeries {
    pub fn push(&mut self, entry: FrameEntry) {
        self.face.push(entry.face, entry.face_valid);
        self.left_eye.push(entry.left_eye, entry.left_eye_valid);
        self.right_eye.push(entry.right_eye, entry.right_eye_valid);

        self.screen.heights.push(entry.screen.height);
        self.screen.widths.push(entry.screen.width);
        self.screen.orientations.push(entry.screen.orientation.code());

        self.dots.dot_nums.push(entry.dot.dot_num);
        self.dots.x_pts.push(entry.dot.device.x);
        self.dots.y_pts.push(entry.dot.device.y);
        self.dots.x_cam.push(entry.dot.camera.x);
        self.dots.y_cam.push(entry.dot.camera.y);
        self.dots.times.push(entry.dot.time_secs);

        self.pose.yaw.push(entry.pose.yaw);
        self.pose.pitch.push(entry.pose.pitch);
        self.pose.roll.push(entry.pose.roll);
        self.pose.quality.push(entry.pose.quality);

        self.frame_names.push(entry.frame_name);
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.frame_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_names.is_empty()
    }

    /// Length of every column, by name.
    pub fn lengths(&self) -> Vec<(&'static str, usize)> {
        let mut lengths = Vec::with_capacity(35);
        for (names, series) in [
            (
                ["appleFace.H", "appleFace.W", "appleFace.X", "appleFace.Y", "appleFace.IsValid"],
                &self.face,
            ),
            (
                [
                    "appleLeftEye.H",
                    "appleLeftEye.W",
                    "appleLeftEye.X",
                    "appleLeftEye.Y",
                    "appleLeftEye.IsValid",
                ],
                &self.left_eye,
            ),
            (
                [
                    "appleRightEye.H",
                    "appleRightEye.W",
                    "appleRightEye.X",
                    "appleRightEye.Y",
                    "appleRightEye.IsValid",
                ],
                &self.right_eye,
            ),
        ] {
            lengths.extend(names.into_iter().zip(series.lengths()));
        }
        lengths.extend([
            ("screen.H", self.screen.heights.len()),
            ("screen.W", self.screen.widths.len()),
            ("screen.Orientation", self.screen.orientations.len()),
            ("dotInfo.DotNum", self.dots.dot_nums.len()),
            ("dotInfo.XPts", self.dots.x_pts.len()),
            ("dotInfo.YPts", self.dots.y_pts.len()),
            ("dotInfo.XCam", self.dots.x_cam.len()),
            ("dotInfo.YCam", self.dots.y_cam.len()),
            ("dotInfo.Time", self.dots.times.len()),
            ("headPose.Yaw", self.pose.yaw.len()),
            ("headPose.Pitch", self.pose.pitch.len()),
            ("headPose.Roll", self.pose.roll.len()),
            ("headPose.Quality", self.pose.quality.len()),
            ("frameNames", self.frame_names.len()),
        ]);
        lengths
    }

    /// The common column length, or an error naming the columns that differ.
    pub fn check_alignment(&self) -> Result<usize, RecorderError> {
        let expected = self.len();
        let mismatched: Vec<String> = self
            .lengths()
            .into_iter()
            .filter(|(_, len)| *len != expected)
            .map(|(name, len)| format!("{name}={len}"))
            .collect();

        if mismatched.is_empty() {
            Ok(expected)
        } else {
            Err(RecorderError::Misaligned(format!(
                "expected {expected} entries, got {}",
                mismatched.join(", ")
            )))
        }
    }
}
