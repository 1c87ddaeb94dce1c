use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Lifecycle of the recorder: `Idle -> Recording -> Finalizing -> Idle`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Recording,
    Finalizing,
}

/// One recording run and the directory it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Directory name, `MMddyy-HH:mm:ss` with an optional `-N` suffix.
    pub name: String,
    pub directory: PathBuf,
    pub device_name: String,
    pub started_at: DateTime<Local>,
}
