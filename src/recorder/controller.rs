use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Local};
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    capture::{FlushController, FlushSummary, FrameWriter},
    device::{resolve_calibration, DeviceMetricsProvider},
    error::{ExportFailure, FrameWriteFailure, RecorderError, Result},
    export::DatasetExporter,
    models::{CalibrationSample, FaceObservation, RawFrame, ScreenMetrics, Session, SessionStatus},
    settings::RecorderSettings,
};

use super::state::{FrameDiagnostics, RecorderState};

/// `MMddyy-HH:mm:ss`, always numeric.
pub const SESSION_NAME_FORMAT: &str = "%m%d%y-%H:%M:%S";

pub fn session_name(at: &DateTime<Local>) -> String {
    at.format(SESSION_NAME_FORMAT).to_string()
}

/// Create `root/<name>`, adding `-1`, `-2`, ... if the name is taken.
pub fn create_session_dir(root: &Path, base_name: &str) -> Result<(String, PathBuf)> {
    fs::create_dir_all(root).map_err(|source| RecorderError::Storage {
        path: root.to_path_buf(),
        source,
    })?;

    let mut suffix = 0u32;
    loop {
        let name = if suffix == 0 {
            base_name.to_string()
        } else {
            format!("{base_name}-{suffix}")
        };
        let path = root.join(&name);
        match fs::create_dir(&path) {
            Ok(()) => return Ok((name, path)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
            Err(source) => return Err(RecorderError::Storage { path, source }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSnapshot {
    pub status: SessionStatus,
    pub session_name: Option<String>,
    pub total_frames: usize,
    pub num_face_detections: u64,
    pub num_eye_detections: u64,
    pub buffered_frames: usize,
    pub flushes: u64,
}

/// Outcome of a stopped session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session: Session,
    pub total_frames: usize,
    pub num_face_detections: u64,
    pub num_eye_detections: u64,
    /// Size of each flushed batch, in order.
    pub flush_batches: Vec<usize>,
    pub frames_written: usize,
    pub frame_failures: Vec<FrameWriteFailure>,
    /// Set when the flush worker did not finish cleanly.
    pub flush_error: Option<String>,
    pub files_written: Vec<String>,
    pub export_failures: Vec<ExportFailure>,
    pub diagnostics: FrameDiagnostics,
}

impl SessionReport {
    /// Every table written and every frame on disk.
    pub fn is_complete(&self) -> bool {
        self.flush_error.is_none()
            && self.frame_failures.is_empty()
            && self.export_failures.is_empty()
            && self.frames_written == self.total_frames
    }
}

/// Single writer for a recording session's state.
///
/// Cheap to clone; clones share the same session. All per-frame mutation
/// happens under one lock, and the lock is never held across disk I/O.
#[derive(Clone)]
pub struct SessionRecorder {
    state: Arc<Mutex<RecorderState>>,
    settings: Arc<RecorderSettings>,
    device: Arc<dyn DeviceMetricsProvider>,
}

impl SessionRecorder {
    pub fn new(settings: RecorderSettings, device: Arc<dyn DeviceMetricsProvider>) -> Self {
        let state = RecorderState::new(settings.max_frames_cache_size, settings.eye_box);
        Self {
            state: Arc::new(Mutex::new(state)),
            settings: Arc::new(settings),
            device,
        }
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    pub async fn snapshot(&self) -> RecorderSnapshot {
        let guard = self.state.lock().await;
        RecorderSnapshot {
            status: guard.status,
            session_name: guard.session.as_ref().map(|s| s.name.clone()),
            total_frames: guard.series.len(),
            num_face_detections: guard.num_face_detections,
            num_eye_detections: guard.num_eye_detections,
            buffered_frames: guard.buffer.len(),
            flushes: guard.buffer.flush_count(),
        }
    }

    /// Create the session directory and start accepting frames.
    pub async fn start_session(&self) -> Result<Session> {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Idle {
            return Err(RecorderError::AlreadyRecording);
        }

        let started_at = Local::now();
        let (name, directory) =
            create_session_dir(&self.settings.output_root, &session_name(&started_at))?;

        let calibration = resolve_calibration(self.device.as_ref(), &self.settings.devices);
        if !calibration.profile_found {
            warn!(
                "No device profile for '{}'; camera offset defaults to zero",
                calibration.device_name
            );
        }
        if calibration.points_per_cm.is_none() {
            warn!(
                "No points-per-centimeter for '{}'; dot camera coordinates will be zero",
                calibration.device_name
            );
        }

        let session = Session {
            name,
            directory: directory.clone(),
            device_name: calibration.device_name.clone(),
            started_at,
        };

        let flusher = FlushController::start(
            FrameWriter::new(
                directory,
                self.settings.jpeg_quality,
                self.settings.mirror_frames,
            ),
            self.settings.flush_queue_depth,
        );
        state.begin_session(session.clone(), calibration, flusher);

        info!(
            "Recording session {} in {}",
            session.name,
            session.directory.display()
        );
        Ok(session)
    }

    /// Append one processed frame. `detection` is `None` when the detector
    /// found nothing; that frame is still recorded, as invalid.
    pub async fn record_frame(
        &self,
        detection: Option<&FaceObservation>,
        frame: RawFrame,
        screen: ScreenMetrics,
        calibration: Option<CalibrationSample>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Recording {
            return Err(RecorderError::NotRecording);
        }

        if let Some(batch) = state.apply_frame(detection, frame, screen, calibration) {
            let submitted = match state.flusher.as_mut() {
                Some(flusher) => flusher.submit(batch),
                None => Err(RecorderError::FlushWorker("no flush worker".into())),
            };
            if let Err(err) = submitted {
                warn!("Frames not queued for writing: {err}");
            }
        }
        Ok(())
    }

    /// Flush what is left, wait for the writer, export the tables and go
    /// back to idle. File-level problems are collected in the report and
    /// logged once here.
    ///
    /// A writer that is still busy after `flushTimeoutSecs` is cancelled; the
    /// report then lists every frame without a file and export still runs.
    pub async fn stop_session(&self) -> Result<SessionReport> {
        let (finalized, tail, flusher) = {
            let mut state = self.state.lock().await;
            if state.status != SessionStatus::Recording {
                return Err(RecorderError::NotRecording);
            }
            state.finalize().ok_or(RecorderError::NotRecording)?
        };

        let (flush, flush_error) = match flusher {
            Some(mut flusher) => {
                let (summary, error) = flusher.finish(tail, self.settings.flush_timeout()).await;
                (summary, error.map(|err| err.to_string()))
            }
            None => (
                FlushSummary::default(),
                Some("flush worker missing at stop".to_string()),
            ),
        };

        if let Err(err) = finalized.series.check_alignment() {
            error!("Session {} series check failed: {err}", finalized.session.name);
        }

        let exporter = DatasetExporter::new(self.settings.export_head_pose);
        let (files_written, export_failures) = match exporter.export(&finalized) {
            Ok(files) => (files, Vec::new()),
            Err(RecorderError::Export { failures, .. }) => {
                let written = exporter
                    .file_names()
                    .into_iter()
                    .filter(|name| !failures.iter().any(|f| &f.file == name))
                    .collect();
                (written, failures)
            }
            Err(other) => {
                let failure = ExportFailure {
                    file: "*".into(),
                    reason: other.to_string(),
                };
                (Vec::new(), vec![failure])
            }
        };

        self.state.lock().await.reset_to_idle();

        let report = SessionReport {
            total_frames: finalized.total_frames(),
            num_face_detections: finalized.num_face_detections,
            num_eye_detections: finalized.num_eye_detections,
            flush_batches: flush.batch_sizes,
            frames_written: flush.frames_written,
            frame_failures: flush.failures,
            flush_error,
            files_written,
            export_failures,
            diagnostics: finalized.diagnostics,
            session: finalized.session,
        };

        log_report(&report);
        Ok(report)
    }

    /// Abandon the current session without exporting. Frames already
    /// written stay on disk. A no-op when idle.
    pub async fn cancel_session(&self) -> Result<()> {
        let (session, flusher) = {
            let mut state = self.state.lock().await;
            if state.status == SessionStatus::Idle {
                return Ok(());
            }
            if state.status == SessionStatus::Finalizing {
                return Err(RecorderError::NotRecording);
            }
            let session = state.session.take();
            let flusher = state.flusher.take();
            state.reset_to_idle();
            (session, flusher)
        };

        if let Some(mut flusher) = flusher {
            let summary = flusher.cancel().await;
            info!(
                "Cancelled session {}; {} frames had been written",
                session.as_ref().map(|s| s.name.as_str()).unwrap_or("?"),
                summary.frames_written
            );
        }
        Ok(())
    }
}

fn log_report(report: &SessionReport) {
    if !report.frame_failures.is_empty() {
        warn!(
            "Session {}: {} of {} frames were not written (first: {})",
            report.session.name,
            report.frame_failures.len(),
            report.total_frames,
            report.frame_failures[0]
        );
    }
    if let Some(err) = &report.flush_error {
        error!("Session {}: {err}", report.session.name);
    }
    if !report.export_failures.is_empty() {
        let failures: Vec<String> = report.export_failures.iter().map(|f| f.to_string()).collect();
        error!(
            "Session {}: export failed for {}",
            report.session.name,
            failures.join("; ")
        );
    }

    info!(
        "Session {} finished: {} frames, {} faces, {} eye pairs, {} flushes",
        report.session.name,
        report.total_frames,
        report.num_face_detections,
        report.num_eye_detections,
        report.flush_batches.len()
    );
}
