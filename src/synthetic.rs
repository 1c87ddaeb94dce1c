//! Deterministic stand-in for the camera and face detector: a face that
//! drifts across the frame, with optional detector dropouts.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::calibration::DotSchedule;
use crate::capture::FrameEvent;
use crate::geometry::{Point, Rect};
use crate::models::{
    DeviceOrientation, FaceLandmarks, FaceObservation, RawFrame, ScreenMetrics,
};

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub screen: ScreenMetrics,
    /// Sensor frame size; frames are cropped to the screen aspect on write.
    pub frame_width: u32,
    pub frame_height: u32,
    pub fps: f32,
    /// Every n-th frame has no detection.
    pub dropout_every: Option<u64>,
    /// Run the calibration dot sequence alongside the frames.
    pub with_dots: bool,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            screen: ScreenMetrics::new(390, 844, DeviceOrientation::Portrait),
            frame_width: 120,
            frame_height: 160,
            fps: 30.0,
            dropout_every: None,
            with_dots: true,
            seed: 7,
        }
    }
}

/// Normalized size of the synthetic face box.
pub const FACE_SIZE: (f32, f32) = (0.5, 0.35);

pub struct SyntheticSource {
    config: SyntheticConfig,
    schedule: Option<DotSchedule>,
    rng: StdRng,
    next_index: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let schedule = config
            .with_dots
            .then(|| DotSchedule::thirds(config.screen.width, config.screen.height));
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            schedule,
            rng,
            next_index: 0,
        }
    }

    /// Frames needed to run through the whole dot sequence once.
    pub fn frames_for_schedule(&self) -> u64 {
        self.schedule
            .as_ref()
            .map(|schedule| (schedule.duration().as_secs_f32() * self.config.fps).ceil() as u64)
            .unwrap_or(0)
    }

    fn observation(&mut self, t: f32) -> FaceObservation {
        let (w, h) = FACE_SIZE;
        let jitter_x = self.rng.gen_range(-0.005..0.005);
        let jitter_y = self.rng.gen_range(-0.005..0.005);
        let x = 0.25 + 0.1 * (t * 0.8).sin() + jitter_x;
        let y = 0.3 + 0.05 * (t * 0.5).cos() + jitter_y;
        let face = Rect::new(x, y, w, h);

        let brow_y = y + 0.75 * h;
        let brow = |start: f32| {
            vec![
                Point::new(start, brow_y),
                Point::new(start + 0.08 * w, brow_y + 0.02 * h),
                Point::new(start + 0.16 * w, brow_y + 0.03 * h),
                Point::new(start + 0.24 * w, brow_y + 0.02 * h),
                Point::new(start + 0.32 * w, brow_y),
            ]
        };

        let yaw = 0.2 * (t * 0.8).sin();
        let pitch = self.rng.gen_range(-0.05..0.05);
        let roll = self.rng.gen_range(-0.05..0.05);
        let quality = self.rng.gen_range(0.5..0.95);

        FaceObservation::new(face)
            .with_landmarks(FaceLandmarks {
                left_eyebrow: brow(x + 0.1 * w),
                right_eyebrow: brow(x + 0.58 * w),
            })
            .with_pose(yaw, pitch, roll)
            .with_quality(quality)
    }
}

impl Iterator for SyntheticSource {
    type Item = FrameEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next_index;
        self.next_index += 1;

        let fps = if self.config.fps > 0.0 { self.config.fps } else { 30.0 };
        let t = index as f32 / fps;

        let dropped = self
            .config
            .dropout_every
            .is_some_and(|n| n > 0 && (index + 1) % n == 0);
        let detection = (!dropped).then(|| self.observation(t));

        let shade = (64 + (index % 128)) as u8;
        let frame = RawFrame::filled(
            self.config.frame_width,
            self.config.frame_height,
            [shade, shade / 2, 255 - shade, 255],
            t as f64,
        );

        let calibration = self
            .schedule
            .as_ref()
            .and_then(|schedule| schedule.sample_at(Duration::from_secs_f32(t)));

        Some(FrameEvent {
            detection,
            frame,
            screen: self.config.screen,
            calibration,
        })
    }
}
