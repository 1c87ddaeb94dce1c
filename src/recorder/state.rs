use crate::capture::{FlushBatch, FlushController, FrameBuffer};
use crate::device::DeviceCalibration;
use crate::error::GeometryError;
use crate::geometry::{
    device_point_to_camera, eye_box, eyebrow_endpoints, normalized_to_image, EyeBoxParams, Point,
    Rect,
};
use crate::models::{
    CalibrationSample, FaceObservation, RawFrame, ScreenMetrics, Session, SessionStatus,
};

use super::series::{DotEntry, FrameEntry, PoseEntry, SessionSeries};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Counters that never reach the dataset tables but explain gaps in them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameDiagnostics {
    /// Dot frames whose camera position fell back to zero.
    pub unknown_device_frames: u64,
    /// Eyebrow contours with a point count the eye heuristic cannot use.
    pub invalid_landmark_frames: u64,
}

/// Everything export needs once recording has stopped.
#[derive(Debug, Clone)]
pub struct FinalizedSession {
    pub session: Session,
    pub series: SessionSeries,
    pub num_face_detections: u64,
    pub num_eye_detections: u64,
    pub diagnostics: FrameDiagnostics,
}

impl FinalizedSession {
    pub fn total_frames(&self) -> usize {
        self.series.len()
    }
}

/// Mutable recorder state. Lives behind the recorder's single lock; every
/// per-frame mutation goes through [`RecorderState::apply_frame`].
pub struct RecorderState {
    pub status: SessionStatus,
    pub session: Option<Session>,
    pub series: SessionSeries,
    pub buffer: FrameBuffer,
    pub num_face_detections: u64,
    pub num_eye_detections: u64,
    pub diagnostics: FrameDiagnostics,
    pub calibration: Option<DeviceCalibration>,
    pub flusher: Option<FlushController>,
    eye_params: EyeBoxParams,
}

impl RecorderState {
    pub fn new(max_frames_cache_size: usize, eye_params: EyeBoxParams) -> Self {
        Self {
            status: SessionStatus::Idle,
            session: None,
            series: SessionSeries::default(),
            buffer: FrameBuffer::new(max_frames_cache_size),
            num_face_detections: 0,
            num_eye_detections: 0,
            diagnostics: FrameDiagnostics::default(),
            calibration: None,
            flusher: None,
            eye_params,
        }
    }

    /// Reset every series and counter for a new recording.
    pub fn begin_session(
        &mut self,
        session: Session,
        calibration: DeviceCalibration,
        flusher: FlushController,
    ) {
        let capacity = self.buffer.capacity();
        let eye_params = self.eye_params;
        *self = Self::new(capacity, eye_params);
        self.status = SessionStatus::Recording;
        self.session = Some(session);
        self.calibration = Some(calibration);
        self.flusher = Some(flusher);
    }

    /// Record one processed frame.
    ///
    /// Always appends exactly one entry to every series, whether or not a
    /// face was found. Returns the batch to hand to the flush worker when
    /// this frame filled the buffer.
    pub fn apply_frame(
        &mut self,
        detection: Option<&FaceObservation>,
        frame: RawFrame,
        screen: ScreenMetrics,
        calibration: Option<CalibrationSample>,
    ) -> Option<FlushBatch> {
        let width = screen.width as f32;
        let height = screen.height as f32;
        let detection = detection.filter(|d| d.has_face());

        let (face, face_valid) = match detection {
            Some(observation) => (normalized_to_image(observation.bounding_box, width, height), true),
            None => (Rect::ZERO, false),
        };

        let landmarks = detection.and_then(|d| d.landmarks.as_ref());
        let (left_eye, left_eye_valid) = match landmarks {
            Some(marks) => self.eye_for(&marks.left_eyebrow, face, width, height),
            None => (Rect::ZERO, false),
        };
        let (right_eye, right_eye_valid) = match landmarks {
            Some(marks) => self.eye_for(&marks.right_eyebrow, face, width, height),
            None => (Rect::ZERO, false),
        };

        if face_valid {
            self.num_face_detections += 1;
        }
        if left_eye_valid && right_eye_valid {
            self.num_eye_detections += 1;
        }

        let dot = match calibration {
            Some(sample) => self.dot_entry(sample),
            None => DotEntry::NONE,
        };

        let pose = detection
            .map(|d| PoseEntry {
                yaw: d.yaw.unwrap_or(0.0),
                pitch: d.pitch.unwrap_or(0.0),
                roll: d.roll.unwrap_or(0.0),
                quality: d.capture_quality.unwrap_or(0.0),
            })
            .unwrap_or_default();

        let crop_to = (screen.width > 0 && screen.height > 0).then_some((screen.width, screen.height));
        let push = self.buffer.append_cropped(frame, crop_to);
        debug_assert_eq!(push.index as usize, self.series.len());

        let session_name = self
            .session
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or("session");
        let frame_name = format!("{session_name}_{}.jpg", push.index);

        self.series.push(FrameEntry {
            face,
            face_valid,
            left_eye,
            left_eye_valid,
            right_eye,
            right_eye_valid,
            screen,
            dot,
            pose,
            frame_name,
        });

        log_debug!(
            "frame {} recorded (face={}, eyes={}/{})",
            push.index,
            face_valid,
            left_eye_valid,
            right_eye_valid
        );

        push.flushed
    }

    /// Hand back the finished session and everything buffered, leaving the
    /// state in `Finalizing` with empty series.
    pub fn finalize(&mut self) -> Option<(FinalizedSession, Option<FlushBatch>, Option<FlushController>)> {
        let session = self.session.take()?;
        self.status = SessionStatus::Finalizing;

        let tail = self.buffer.flush();
        let finalized = FinalizedSession {
            session,
            series: std::mem::take(&mut self.series),
            num_face_detections: self.num_face_detections,
            num_eye_detections: self.num_eye_detections,
            diagnostics: self.diagnostics,
        };
        Some((finalized, tail, self.flusher.take()))
    }

    pub fn reset_to_idle(&mut self) {
        let capacity = self.buffer.capacity();
        let eye_params = self.eye_params;
        *self = Self::new(capacity, eye_params);
    }

    fn eye_for(&mut self, contour: &[Point], face: Rect, width: f32, height: f32) -> (Rect, bool) {
        let endpoints = eyebrow_endpoints(contour);
        match eye_box(&endpoints, face, width, height, &self.eye_params) {
            Ok(rect) => (rect, endpoints.len() == 2),
            Err(GeometryError::InvalidLandmarkInput { count }) => {
                self.diagnostics.invalid_landmark_frames += 1;
                log_warn!("eyebrow contour with {count} point(s); eye box left empty");
                (Rect::ZERO, false)
            }
            Err(err) => {
                log_warn!("eye box failed: {err}");
                (Rect::ZERO, false)
            }
        }
    }

    fn dot_entry(&mut self, sample: CalibrationSample) -> DotEntry {
        let camera = match self.calibration.as_ref() {
            Some(calibration) => device_point_to_camera(
                sample.position,
                calibration.points_per_cm,
                calibration.camera_offset_cm,
                &calibration.device_name,
            ),
            None => Err(GeometryError::UnknownDeviceMetrics {
                device: String::new(),
            }),
        };

        let camera = match camera {
            Ok(point) => point,
            Err(err) => {
                self.diagnostics.unknown_device_frames += 1;
                if self.diagnostics.unknown_device_frames == 1 {
                    log_warn!("{err}; camera coordinates recorded as zero");
                }
                Point::ZERO
            }
        };

        DotEntry {
            dot_num: sample.dot_index as i32,
            device: sample.position,
            camera,
            time_secs: sample.time_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviceOrientation, FaceLandmarks};
    use chrono::Local;
    use std::path::PathBuf;

    fn recording_state(capacity: usize, points_per_cm: Option<f32>) -> RecorderState {
        let mut state = RecorderState::new(capacity, EyeBoxParams::default());
        state.status = SessionStatus::Recording;
        state.session = Some(Session {
            name: "010203-04:05:06".into(),
            directory: PathBuf::from("unused"),
            device_name: "test".into(),
            started_at: Local::now(),
        });
        state.calibration = Some(DeviceCalibration {
            device_name: "test".into(),
            points_per_cm,
            camera_offset_cm: Point::new(2.6, 0.5),
            profile_found: true,
        });
        state
    }

    fn screen() -> ScreenMetrics {
        ScreenMetrics::new(390, 844, DeviceOrientation::Portrait)
    }

    fn frame() -> RawFrame {
        RawFrame::filled(4, 4, [0, 0, 0, 255], 0.0)
    }

    fn eyebrow(valid: bool, x: f32) -> Vec<Point> {
        if valid {
            vec![Point::new(x, 0.6), Point::new(x + 0.05, 0.62), Point::new(x + 0.1, 0.6)]
        } else {
            Vec::new()
        }
    }

    fn observation(left: bool, right: bool) -> FaceObservation {
        FaceObservation::new(Rect::new(0.2, 0.3, 0.5, 0.4)).with_landmarks(FaceLandmarks {
            left_eyebrow: eyebrow(left, 0.25),
            right_eyebrow: eyebrow(right, 0.5),
        })
    }

    #[test]
    fn eye_count_requires_both_eyes() {
        let mut state = recording_state(100, None);
        let pairs = [
            (true, true),
            (true, false),
            (false, true),
            (false, false),
            (true, true),
        ];
        let expected = [1, 1, 1, 1, 2];

        for ((left, right), want) in pairs.into_iter().zip(expected) {
            state.apply_frame(Some(&observation(left, right)), frame(), screen(), None);
            assert_eq!(state.num_eye_detections, want);
        }
        assert_eq!(state.num_face_detections, 5);
        assert_eq!(state.series.left_eye.valids, vec![1, 1, 0, 0, 1]);
        assert_eq!(state.series.right_eye.valids, vec![1, 0, 1, 0, 1]);
    }

    #[test]
    fn missing_detection_still_appends_everywhere() {
        let mut state = recording_state(100, None);
        for i in 0..5 {
            state.apply_frame(None, frame(), screen(), None);
            assert_eq!(state.series.check_alignment().unwrap(), i + 1);
        }
        assert_eq!(state.num_face_detections, 0);
        assert_eq!(state.series.face.valids, vec![0; 5]);
        assert_eq!(state.series.face.heights, vec![0.0; 5]);
    }

    #[test]
    fn buffer_flush_is_returned_at_capacity() {
        let mut state = recording_state(3, None);
        assert!(state.apply_frame(None, frame(), screen(), None).is_none());
        assert!(state.apply_frame(None, frame(), screen(), None).is_none());
        let batch = state.apply_frame(None, frame(), screen(), None).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.frames[0].crop_to, Some((390, 844)));
        assert!(state.buffer.is_empty());
    }

    #[test]
    fn frame_names_follow_session_and_index() {
        let mut state = recording_state(10, None);
        state.apply_frame(None, frame(), screen(), None);
        state.apply_frame(None, frame(), screen(), None);
        assert_eq!(
            state.series.frame_names,
            vec!["010203-04:05:06_0.jpg", "010203-04:05:06_1.jpg"]
        );
    }

    #[test]
    fn single_point_eyebrow_degrades_to_invalid_eye() {
        let mut state = recording_state(10, None);
        let detection = FaceObservation::new(Rect::new(0.2, 0.3, 0.5, 0.4)).with_landmarks(
            FaceLandmarks {
                left_eyebrow: vec![Point::new(0.3, 0.6)],
                right_eyebrow: eyebrow(true, 0.5),
            },
        );
        state.apply_frame(Some(&detection), frame(), screen(), None);
        assert_eq!(state.series.left_eye.valids, vec![0]);
        assert_eq!(state.series.right_eye.valids, vec![1]);
        assert_eq!(state.num_eye_detections, 0);
        assert_eq!(state.diagnostics.invalid_landmark_frames, 1);
    }

    #[test]
    fn unknown_device_metrics_record_zero_camera_point() {
        let mut state = recording_state(10, None);
        let sample = CalibrationSample {
            dot_index: 1,
            position: Point::new(260.0, 562.0),
            time_secs: 4.5,
        };
        state.apply_frame(None, frame(), screen(), Some(sample));

        assert_eq!(state.series.dots.dot_nums, vec![1]);
        assert_eq!(state.series.dots.x_pts, vec![260.0]);
        assert_eq!(state.series.dots.x_cam, vec![0.0]);
        assert_eq!(state.series.dots.y_cam, vec![0.0]);
        assert_eq!(state.diagnostics.unknown_device_frames, 1);
    }

    #[test]
    fn known_device_metrics_convert_dot_to_camera() {
        let mut state = recording_state(10, Some(100.0));
        let sample = CalibrationSample {
            dot_index: 0,
            position: Point::new(130.0, 281.0),
            time_secs: 0.5,
        };
        state.apply_frame(None, frame(), screen(), Some(sample));

        assert!((state.series.dots.x_cam[0] - (1.3 - 2.6)).abs() < 1e-4);
        assert!((state.series.dots.y_cam[0] - -(2.81 - 0.5)).abs() < 1e-4);
        assert_eq!(state.diagnostics.unknown_device_frames, 0);
    }

    #[test]
    fn finalize_moves_series_and_tail_out() {
        let mut state = recording_state(10, None);
        state.apply_frame(Some(&observation(true, true)), frame(), screen(), None);
        state.apply_frame(None, frame(), screen(), None);

        let (finalized, tail, _) = state.finalize().unwrap();
        assert_eq!(state.status, SessionStatus::Finalizing);
        assert_eq!(finalized.total_frames(), 2);
        assert_eq!(finalized.num_face_detections, 1);
        assert_eq!(tail.unwrap().len(), 2);
        assert!(state.series.is_empty());
    }
}
