use std::path::PathBuf;

use thiserror::Error;

/// Failures of the pure geometry helpers. Neither aborts a recording: the
/// recorder degrades both to zero-valued geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("eye box needs exactly 2 eyebrow points, got {count}")]
    InvalidLandmarkInput { count: usize },

    #[error("no points-per-centimeter calibration for device '{device}'")]
    UnknownDeviceMetrics { device: String },
}

/// A single frame that could not be written during a flush. Non-fatal: the
/// frame name stays in `frames.json`, the file is missing on disk.
#[derive(Error, Debug, Clone)]
#[error("frame {index} not written to {}: {reason}", path.display())]
pub struct FrameWriteFailure {
    pub index: u64,
    pub path: PathBuf,
    pub reason: String,
}

/// One dataset table that could not be written at export time.
#[derive(Error, Debug, Clone)]
#[error("{file}: {reason}")]
pub struct ExportFailure {
    pub file: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("a recording session is already active")]
    AlreadyRecording,

    #[error("no recording session is active")]
    NotRecording,

    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("export of {} failed for {} file(s): {}", session_dir.display(), failures.len(), join_failures(failures))]
    Export {
        session_dir: PathBuf,
        failures: Vec<ExportFailure>,
    },

    #[error("frame flush did not finish within {secs}s")]
    FlushTimeout { secs: u64 },

    #[error("flush queue full; {frames} frame(s) dropped")]
    FlushQueueFull { frames: usize },

    #[error("frame flush worker failed: {0}")]
    FlushWorker(String),

    #[error("series out of sync: {0}")]
    Misaligned(String),
}

fn join_failures(failures: &[ExportFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, RecorderError>;
