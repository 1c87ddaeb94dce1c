pub mod detection;
pub mod frame;
pub mod orientation;
pub mod session;

pub use detection::{FaceLandmarks, FaceObservation};
pub use frame::{CalibrationSample, RawFrame, ScreenMetrics};
pub use orientation::DeviceOrientation;
pub use session::{Session, SessionStatus};
