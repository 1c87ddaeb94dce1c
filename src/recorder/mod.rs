pub mod controller;
pub mod series;
pub mod state;

pub use controller::{session_name, RecorderSnapshot, SessionRecorder, SessionReport};
pub use series::{BoxSeries, DotSeries, PoseSeries, ScreenSeries, SessionSeries};
pub use state::{FinalizedSession, FrameDiagnostics};
