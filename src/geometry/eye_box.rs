use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

use super::{normalized_point_to_image, Point, Rect};

/// Face width / eye box width.
pub const DEFAULT_WIDTH_PROPORTION: f32 = 3.5;

/// Face height / eye box height.
pub const DEFAULT_HEIGHT_PROPORTION: f32 = 3.34;

/// How the eye box width is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EyeWidthPolicy {
    /// Horizontal distance between the two eyebrow endpoints.
    EyebrowSpan,
    /// Face box width divided by `width_proportion`.
    #[default]
    FaceProportion,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EyeBoxParams {
    pub width_policy: EyeWidthPolicy,
    pub width_proportion: f32,
    pub height_proportion: f32,
}

impl Default for EyeBoxParams {
    fn default() -> Self {
        Self {
            width_policy: EyeWidthPolicy::FaceProportion,
            width_proportion: DEFAULT_WIDTH_PROPORTION,
            height_proportion: DEFAULT_HEIGHT_PROPORTION,
        }
    }
}

/// Reduce a detector eyebrow contour to the two endpoints the heuristic uses.
/// Contours with fewer than two points are passed through untouched so the
/// caller sees the real count.
pub fn eyebrow_endpoints(contour: &[Point]) -> Vec<Point> {
    match contour {
        [] => Vec::new(),
        [only] => vec![*only],
        [first, .., last] => vec![*first, *last],
    }
}

/// Build an eye box from two normalized eyebrow endpoints `[left, right]`.
///
/// `face_box` is the face in device coordinates of a `width` x `height`
/// screen. The result is in the same units but relative to the face box
/// origin, which is the layout the dataset tables use. No points at all is a
/// legitimate "no landmarks" frame and yields [`Rect::ZERO`].
pub fn eye_box(
    eyebrow: &[Point],
    face_box: Rect,
    width: f32,
    height: f32,
    params: &EyeBoxParams,
) -> Result<Rect, GeometryError> {
    let (left, right) = match eyebrow {
        [] => return Ok(Rect::ZERO),
        [left, right] => (*left, *right),
        other => {
            return Err(GeometryError::InvalidLandmarkInput { count: other.len() });
        }
    };

    let left = normalized_point_to_image(left, width, height);
    let right = normalized_point_to_image(right, width, height);

    let box_width = match params.width_policy {
        EyeWidthPolicy::EyebrowSpan => (right.x - left.x).abs(),
        EyeWidthPolicy::FaceProportion => face_box.width / params.width_proportion,
    };
    let box_height = face_box.height / params.height_proportion;

    Ok(Rect::new(left.x, left.y, box_width, box_height).relative_to(face_box.origin()))
}
