use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use image::{codecs::jpeg::JpegEncoder, imageops, DynamicImage, RgbImage, RgbaImage};
use tokio_util::sync::CancellationToken;

use crate::error::FrameWriteFailure;

use super::frame_buffer::{BufferedFrame, FlushBatch};

// Set to true to enable per-frame write logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub fn frame_file_name(index: u64) -> String {
    format!("frame_{index}.jpg")
}

/// Largest centered region of a `width` x `height` image with the aspect ratio
/// of `target_width` x `target_height`. Returns `(x, y, w, h)`; only the longer
/// side is cut, nothing is stretched.
pub fn center_crop_region(
    width: u32,
    height: u32,
    target_width: u32,
    target_height: u32,
) -> (u32, u32, u32, u32) {
    if width == 0 || height == 0 || target_width == 0 || target_height == 0 {
        return (0, 0, width, height);
    }

    let source = width as f64 / height as f64;
    let target = target_width as f64 / target_height as f64;
    if source > target {
        let cropped = ((height as f64 * target).round() as u32).clamp(1, width);
        ((width - cropped) / 2, 0, cropped, height)
    } else {
        let cropped = ((width as f64 / target).round() as u32).clamp(1, height);
        (0, (height - cropped) / 2, width, cropped)
    }
}

/// Turn a buffered RGBA frame into the RGB image that goes on disk.
pub fn prepare_image(buffered: &BufferedFrame, mirror: bool) -> Result<RgbImage, String> {
    let frame = &buffered.frame;
    if frame.rgba.len() != frame.expected_len() {
        return Err(format!(
            "pixel buffer has {} bytes, expected {} for {}x{}",
            frame.rgba.len(),
            frame.expected_len(),
            frame.width,
            frame.height
        ));
    }

    let mut image = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
        .ok_or_else(|| "pixel buffer does not match frame size".to_string())?;

    if mirror {
        imageops::flip_horizontal_in_place(&mut image);
    }

    if let Some((target_w, target_h)) = buffered.crop_to {
        let (x, y, w, h) = center_crop_region(image.width(), image.height(), target_w, target_h);
        if (w, h) != image.dimensions() {
            image = imageops::crop_imm(&image, x, y, w, h).to_image();
        }
    }

    Ok(DynamicImage::ImageRgba8(image).to_rgb8())
}

pub fn write_jpeg(path: &Path, image: &RgbImage, quality: u8) -> Result<(), String> {
    let file = File::create(path).map_err(|err| err.to_string())?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    encoder.encode_image(image).map_err(|err| err.to_string())
}

/// Outcome of writing one batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub written: usize,
    pub failures: Vec<FrameWriteFailure>,
    pub cancelled: bool,
}

/// Encodes and writes frames into a session directory. Blocking; run it on a
/// blocking worker.
#[derive(Debug, Clone)]
pub struct FrameWriter {
    session_dir: PathBuf,
    jpeg_quality: u8,
    mirror: bool,
}

impl FrameWriter {
    pub fn new(session_dir: PathBuf, jpeg_quality: u8, mirror: bool) -> Self {
        Self {
            session_dir,
            jpeg_quality: jpeg_quality.clamp(1, 100),
            mirror,
        }
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        self.session_dir.join(frame_file_name(index))
    }

    /// Write every frame of `batch`. A failing frame is recorded and skipped;
    /// cancellation stops before the next frame.
    pub fn write_batch(&self, batch: &FlushBatch, cancel: &CancellationToken) -> BatchOutcome {
        self.write_batch_observed(batch, cancel, |_, _| {})
    }

    /// Like [`FrameWriter::write_batch`], calling `observe` after every
    /// attempted frame with its index and failure, if any.
    pub fn write_batch_observed(
        &self,
        batch: &FlushBatch,
        cancel: &CancellationToken,
        mut observe: impl FnMut(u64, Option<&FrameWriteFailure>),
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for buffered in &batch.frames {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            outcome.attempted += 1;

            let path = self.path_for(buffered.index);
            let result = prepare_image(buffered, self.mirror)
                .and_then(|image| write_jpeg(&path, &image, self.jpeg_quality));

            match result {
                Ok(()) => {
                    outcome.written += 1;
                    log_debug!("wrote {}", path.display());
                    observe(buffered.index, None);
                }
                Err(reason) => {
                    log_warn!("frame {} write failed: {reason}", buffered.index);
                    let failure = FrameWriteFailure {
                        index: buffered.index,
                        path,
                        reason,
                    };
                    observe(buffered.index, Some(&failure));
                    outcome.failures.push(failure);
                }
            }
        }

        outcome
    }
}
