use serde::{Deserialize, Serialize};

/// Physical device orientation as reported by the host, stored per frame in
/// `screen.json` by its numeric code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DeviceOrientation {
    #[default]
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
}

impl DeviceOrientation {
    pub fn code(self) -> i32 {
        match self {
            DeviceOrientation::Unknown => 0,
            DeviceOrientation::Portrait => 1,
            DeviceOrientation::PortraitUpsideDown => 2,
            DeviceOrientation::LandscapeLeft => 3,
            DeviceOrientation::LandscapeRight => 4,
            DeviceOrientation::FaceUp => 5,
            DeviceOrientation::FaceDown => 6,
        }
    }
}
