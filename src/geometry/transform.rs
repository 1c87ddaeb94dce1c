//! Conversions between the three coordinate spaces of the pipeline:
//!
//! - normalized: unit square, origin bottom-left (detector output)
//! - device/image: pixels or points of a given width/height, origin top-left
//! - camera: centimeters from the front camera lens, up and right positive

use crate::error::GeometryError;

use super::{Point, Rect};

/// Scale a normalized rect to a `width` x `height` image and flip it so the
/// origin becomes the top-left corner.
pub fn normalized_to_image(rect: Rect, width: f32, height: f32) -> Rect {
    let w = rect.width * width;
    let h = rect.height * height;
    Rect {
        x: rect.x * width,
        y: height - rect.y * height - h,
        width: w,
        height: h,
    }
}

/// Inverse of [`normalized_to_image`]. Zero-sized targets map to [`Rect::ZERO`].
pub fn image_to_normalized(rect: Rect, width: f32, height: f32) -> Rect {
    if width <= 0.0 || height <= 0.0 {
        return Rect::ZERO;
    }
    let h = rect.height / height;
    Rect {
        x: rect.x / width,
        y: (height - rect.y - rect.height) / height,
        width: rect.width / width,
        height: h,
    }
}

/// A single normalized point in image space (same flip as the rect version).
pub fn normalized_point_to_image(point: Point, width: f32, height: f32) -> Point {
    Point::new(point.x * width, height - point.y * height)
}

/// Convert a device-space point (points, origin top-left) into camera space.
///
/// `points_per_cm` comes from the host's device metrics; `None` means the
/// running device is not calibrated and yields `UnknownDeviceMetrics`.
pub fn device_point_to_camera(
    point: Point,
    points_per_cm: Option<f32>,
    origin_offset_cm: Point,
    device: &str,
) -> Result<Point, GeometryError> {
    let scale = match points_per_cm {
        Some(scale) if scale.is_finite() && scale > 0.0 => scale,
        _ => {
            return Err(GeometryError::UnknownDeviceMetrics {
                device: device.to_string(),
            })
        }
    };

    let x_cm = point.x / scale;
    let y_cm = point.y / scale;
    Ok(Point::new(
        x_cm - origin_offset_cm.x,
        -(y_cm - origin_offset_cm.y),
    ))
}
