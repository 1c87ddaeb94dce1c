//! Calibration dot sequence shown to the participant while recording.

use std::time::Duration;

use crate::geometry::Point;
use crate::models::CalibrationSample;

/// How long each dot stays at one position.
pub const DEFAULT_DOT_DWELL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone)]
pub struct DotSchedule {
    positions: Vec<Point>,
    dwell: Duration,
}

impl DotSchedule {
    pub fn new(positions: Vec<Point>, dwell: Duration) -> Self {
        Self { positions, dwell }
    }

    /// Two dots, at one third and two thirds of the screen diagonal.
    pub fn thirds(screen_width: u32, screen_height: u32) -> Self {
        let w = screen_width as f32;
        let h = screen_height as f32;
        Self::new(
            vec![
                Point::new(w / 3.0, h / 3.0),
                Point::new(2.0 * w / 3.0, 2.0 * h / 3.0),
            ],
            DEFAULT_DOT_DWELL,
        )
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Total time until the last dot appears and stays.
    pub fn duration(&self) -> Duration {
        self.dwell * self.positions.len() as u32
    }

    /// Dot shown `elapsed` after the sequence started. The last dot is held
    /// once the sequence has run through.
    pub fn sample_at(&self, elapsed: Duration) -> Option<CalibrationSample> {
        let last = self.positions.len().checked_sub(1)?;
        let index = if self.dwell.is_zero() {
            last
        } else {
            ((elapsed.as_secs_f64() / self.dwell.as_secs_f64()) as usize).min(last)
        };
        Some(CalibrationSample {
            dot_index: index as u32,
            position: self.positions[index],
            time_secs: elapsed.as_secs_f32(),
        })
    }
}
