//! Writes a finished session's series as the fixed set of JSON tables.

pub mod tables;

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use serde::Serialize;

use crate::error::{ExportFailure, RecorderError, Result};
use crate::recorder::FinalizedSession;

use tables::{
    BoxTable, DotInfoTable, FramesTable, HeadPoseTable, InfoTable, ScreenTable, DATASET_FILES,
    DOT_INFO_FILE, FACE_FILE, FRAMES_FILE, HEAD_POSE_FILE, INFO_FILE, LEFT_EYE_FILE,
    RIGHT_EYE_FILE, SCREEN_FILE,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetExporter {
    include_head_pose: bool,
}

impl DatasetExporter {
    pub fn new(include_head_pose: bool) -> Self {
        Self { include_head_pose }
    }

    /// Every file this exporter writes, in write order.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = DATASET_FILES.iter().map(|name| name.to_string()).collect();
        if self.include_head_pose {
            names.push(HEAD_POSE_FILE.to_string());
        }
        names
    }

    /// Write every table into the session directory. Each file is attempted
    /// independently; on any failure the error lists every file that failed
    /// and the others are left written.
    pub fn export(&self, finalized: &FinalizedSession) -> Result<Vec<String>> {
        let dir = finalized.session.directory.as_path();
        let series = &finalized.series;
        let mut written = Vec::new();
        let mut failures = Vec::new();

        let mut attempt = |file: &str, outcome: std::result::Result<(), String>| match outcome {
            Ok(()) => {
                log_debug!("wrote {file}");
                written.push(file.to_string());
            }
            Err(reason) => failures.push(ExportFailure {
                file: file.to_string(),
                reason,
            }),
        };

        attempt(FACE_FILE, write_table(dir, FACE_FILE, &BoxTable::from(&series.face)));
        attempt(
            LEFT_EYE_FILE,
            write_table(dir, LEFT_EYE_FILE, &BoxTable::from(&series.left_eye)),
        );
        attempt(
            RIGHT_EYE_FILE,
            write_table(dir, RIGHT_EYE_FILE, &BoxTable::from(&series.right_eye)),
        );
        attempt(
            FRAMES_FILE,
            write_table(
                dir,
                FRAMES_FILE,
                &FramesTable {
                    frame_names: &series.frame_names,
                },
            ),
        );
        attempt(
            INFO_FILE,
            write_table(
                dir,
                INFO_FILE,
                &InfoTable {
                    total_frames: finalized.total_frames(),
                    num_face_detections: finalized.num_face_detections,
                    num_eye_detections: finalized.num_eye_detections,
                    device_name: &finalized.session.device_name,
                },
            ),
        );
        attempt(
            DOT_INFO_FILE,
            write_table(dir, DOT_INFO_FILE, &DotInfoTable::from(&series.dots)),
        );
        attempt(
            SCREEN_FILE,
            write_table(dir, SCREEN_FILE, &ScreenTable::from(&series.screen)),
        );
        if self.include_head_pose {
            attempt(
                HEAD_POSE_FILE,
                write_table(dir, HEAD_POSE_FILE, &HeadPoseTable::from(&series.pose)),
            );
        }

        if failures.is_empty() {
            Ok(written)
        } else {
            Err(RecorderError::Export {
                session_dir: dir.to_path_buf(),
                failures,
            })
        }
    }
}

fn write_table<T: Serialize>(dir: &Path, file: &str, table: &T) -> std::result::Result<(), String> {
    let path = dir.join(file);
    let handle = File::create(&path).map_err(|err| err.to_string())?;
    let mut writer = BufWriter::new(handle);
    serde_json::to_writer(&mut writer, table).map_err(|err| err.to_string())?;
    writer.flush().map_err(|err| err.to_string())
}
