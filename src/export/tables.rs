//! Serialized shapes of the dataset files. Key names are an external
//! contract shared with existing gaze-dataset tooling.

use serde::Serialize;

use crate::recorder::{BoxSeries, DotSeries, PoseSeries, ScreenSeries};

pub const FACE_FILE: &str = "appleFace.json";
pub const LEFT_EYE_FILE: &str = "appleLeftEye.json";
pub const RIGHT_EYE_FILE: &str = "appleRightEye.json";
pub const FRAMES_FILE: &str = "frames.json";
pub const INFO_FILE: &str = "info.json";
pub const DOT_INFO_FILE: &str = "dotInfo.json";
pub const SCREEN_FILE: &str = "screen.json";
pub const HEAD_POSE_FILE: &str = "headPose.json";

/// The seven files every session gets, in write order.
pub const DATASET_FILES: [&str; 7] = [
    FACE_FILE,
    LEFT_EYE_FILE,
    RIGHT_EYE_FILE,
    FRAMES_FILE,
    INFO_FILE,
    DOT_INFO_FILE,
    SCREEN_FILE,
];

#[derive(Debug, Serialize)]
pub struct BoxTable<'a> {
    #[serde(rename = "H")]
    pub heights: &'a [f32],
    #[serde(rename = "W")]
    pub widths: &'a [f32],
    #[serde(rename = "X")]
    pub xs: &'a [f32],
    #[serde(rename = "Y")]
    pub ys: &'a [f32],
    #[serde(rename = "IsValid")]
    pub valids: &'a [u8],
}

impl<'a> From<&'a BoxSeries> for BoxTable<'a> {
    fn from(series: &'a BoxSeries) -> Self {
        Self {
            heights: &series.heights,
            widths: &series.widths,
            xs: &series.xs,
            ys: &series.ys,
            valids: &series.valids,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FramesTable<'a> {
    #[serde(rename = "frameNames")]
    pub frame_names: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InfoTable<'a> {
    pub total_frames: usize,
    pub num_face_detections: u64,
    pub num_eye_detections: u64,
    pub device_name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DotInfoTable<'a> {
    #[serde(rename = "DotNum")]
    pub dot_nums: &'a [i32],
    #[serde(rename = "XPts")]
    pub x_pts: &'a [f32],
    #[serde(rename = "YPts")]
    pub y_pts: &'a [f32],
    #[serde(rename = "XCam")]
    pub x_cam: &'a [f32],
    #[serde(rename = "YCam")]
    pub y_cam: &'a [f32],
    #[serde(rename = "Time")]
    pub times: &'a [f32],
}

impl<'a> From<&'a DotSeries> for DotInfoTable<'a> {
    fn from(series: &'a DotSeries) -> Self {
        Self {
            dot_nums: &series.dot_nums,
            x_pts: &series.x_pts,
            y_pts: &series.y_pts,
            x_cam: &series.x_cam,
            y_cam: &series.y_cam,
            times: &series.times,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScreenTable<'a> {
    #[serde(rename = "H")]
    pub heights: &'a [u32],
    #[serde(rename = "W")]
    pub widths: &'a [u32],
    #[serde(rename = "Orientation")]
    pub orientations: &'a [i32],
}

impl<'a> From<&'a ScreenSeries> for ScreenTable<'a> {
    fn from(series: &'a ScreenSeries) -> Self {
        Self {
            heights: &series.heights,
            widths: &series.widths,
            orientations: &series.orientations,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeadPoseTable<'a> {
    pub yaw: &'a [f32],
    pub pitch: &'a [f32],
    pub roll: &'a [f32],
    pub quality: &'a [f32],
}

impl<'a> From<&'a PoseSeries> for HeadPoseTable<'a> {
    fn from(series: &'a PoseSeries) -> Self {
        Self {
            yaw: &series.yaw,
            pitch: &series.pitch,
            roll: &series.roll,
            quality: &series.quality,
        }
    }
}
