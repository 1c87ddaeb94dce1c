use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::device::DeviceProfile;
use crate::geometry::EyeBoxParams;

pub const OUTPUT_DIR_ENV: &str = "GAZETRACK_OUTPUT_DIR";

/// Recorder configuration, stored as a JSON document. Every field has a
/// default so partial files are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecorderSettings {
    /// Parent of every session directory.
    pub output_root: PathBuf,
    /// Frames held in memory before a flush is handed to the writer.
    pub max_frames_cache_size: usize,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Mirror frames horizontally before writing (front camera correction).
    pub mirror_frames: bool,
    pub eye_box: EyeBoxParams,
    /// Upper bound on waiting for in-flight flushes when a session stops.
    pub flush_timeout_secs: u64,
    /// Flushed batches allowed to wait for the writer. A batch that finds
    /// the queue full is dropped and reported frame by frame.
    pub flush_queue_depth: usize,
    pub ingest_channel_capacity: usize,
    /// Also write `headPose.json` next to the seven dataset tables.
    pub export_head_pose: bool,
    pub devices: Vec<DeviceProfile>,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("sessions"),
            max_frames_cache_size: 20,
            jpeg_quality: 80,
            mirror_frames: true,
            eye_box: EyeBoxParams::default(),
            flush_timeout_secs: 10,
            flush_queue_depth: 4,
            ingest_channel_capacity: 32,
            export_head_pose: false,
            devices: vec![DeviceProfile::reference()],
        }
    }
}

impl RecorderSettings {
    /// Read settings from `path`. A missing file gives the defaults; a file
    /// that does not parse is reported and replaced by the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        match serde_json::from_str::<Self>(&contents) {
            Ok(settings) => Ok(settings.sanitized()),
            Err(err) => {
                warn!(
                    "Ignoring malformed settings at {}: {err}; using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    /// Apply `GAZETRACK_OUTPUT_DIR` if it is set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.output_root = PathBuf::from(dir);
            }
        }
        self
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout_secs)
    }

    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_frames_cache_size == 0 {
            warn!("maxFramesCacheSize must be positive; using {}", defaults.max_frames_cache_size);
            self.max_frames_cache_size = defaults.max_frames_cache_size;
        }
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if self.flush_timeout_secs == 0 {
            warn!(
                "flushTimeoutSecs must be positive; using {}",
                defaults.flush_timeout_secs
            );
            self.flush_timeout_secs = defaults.flush_timeout_secs;
        }
        if self.flush_queue_depth == 0 {
            self.flush_queue_depth = defaults.flush_queue_depth;
        }
        if self.ingest_channel_capacity == 0 {
            self.ingest_channel_capacity = defaults.ingest_channel_capacity;
        }
        if self.eye_box.width_proportion <= 0.0 {
            self.eye_box.width_proportion = defaults.eye_box.width_proportion;
        }
        if self.eye_box.height_proportion <= 0.0 {
            self.eye_box.height_proportion = defaults.eye_box.height_proportion;
        }
        self
    }
}
