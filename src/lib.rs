pub mod calibration;
pub mod capture;
pub mod device;
pub mod error;
pub mod export;
pub mod geometry;
pub mod models;
pub mod recorder;
pub mod settings;
pub mod synthetic;
mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};

use capture::spawn_ingest_loop;
use device::{FixedDeviceMetrics, REFERENCE_DEVICE};
use settings::RecorderSettings;
use synthetic::{SyntheticConfig, SyntheticSource};

pub use error::{GeometryError, RecorderError};
pub use recorder::{SessionRecorder, SessionReport};

/// Device name reported by the demo run; falls back to the reference device.
pub const DEVICE_NAME_ENV: &str = "GAZETRACK_DEVICE";
/// Screen points per centimeter for the demo device; unset means unknown.
pub const POINTS_PER_CM_ENV: &str = "GAZETRACK_POINTS_PER_CM";

/// Record one synthetic session end to end and write its dataset.
///
/// Usage: `gazetrack [settings.json] [frame-count]`.
pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("gazetrack starting up...");

    let mut args = std::env::args().skip(1);
    let settings_path = PathBuf::from(args.next().unwrap_or_else(|| "gazetrack.json".into()));
    let frame_count = match args.next() {
        Some(raw) => Some(
            raw.parse::<u64>()
                .with_context(|| format!("frame count '{raw}' is not a number"))?,
        ),
        None => None,
    };

    let settings = RecorderSettings::load(&settings_path)?.with_env_overrides();
    let device = demo_device();
    let capacity = settings.ingest_channel_capacity;

    let recorder = SessionRecorder::new(settings, Arc::new(device));
    let session = recorder
        .start_session()
        .await
        .context("failed to start recording session")?;
    info!("Session directory: {}", session.directory.display());

    let (sender, ingest) = spawn_ingest_loop(recorder.clone(), capacity);

    let mut source = SyntheticSource::new(SyntheticConfig {
        dropout_every: Some(10),
        ..SyntheticConfig::default()
    });
    let frames = frame_count.unwrap_or_else(|| source.frames_for_schedule());
    for _ in 0..frames {
        let Some(event) = source.next() else {
            break;
        };
        if sender.send(event).await.is_err() {
            warn!("ingest loop stopped early");
            break;
        }
    }
    drop(sender);

    let stats = ingest.join().await?;
    info!("Ingested {} frames ({} rejected)", stats.recorded, stats.rejected);

    let report = recorder.stop_session().await?;
    if !report.is_complete() {
        warn!(
            "Session {} is incomplete: {} frame(s) and {} table(s) missing",
            report.session.name,
            report.frame_failures.len(),
            report.export_failures.len()
        );
    }

    Ok(())
}

fn demo_device() -> FixedDeviceMetrics {
    let name = std::env::var(DEVICE_NAME_ENV).unwrap_or_else(|_| REFERENCE_DEVICE.to_string());
    let points_per_cm = std::env::var(POINTS_PER_CM_ENV)
        .ok()
        .and_then(|raw| match raw.parse::<f32>() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring {POINTS_PER_CM_ENV}='{raw}': {err}");
                None
            }
        });
    FixedDeviceMetrics::new(name, points_per_cm)
}
